//! In-memory remote node store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nodeproxy_core::error::{ProxyError, ProxyResult};
use nodeproxy_core::mutation::executor::Cancellation;
use nodeproxy_core::mutation::planner::UpdateBody;
use nodeproxy_core::node::Node;
use nodeproxy_core::notes::NoteRequest;
use nodeproxy_core::remote::{JobHandle, NodeStore, RemoteReply};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { job_id: String },
    Update { node_id: String, body: Value },
    Delete { node_id: String },
    Note { body: Value },
}

#[derive(Debug, Default)]
pub struct FakeNodeStore {
    nodes: Vec<Node>,
    listing_error: Option<(u16, String)>,
    rejected: HashMap<String, (u16, String)>,
    unreachable: HashSet<String>,
    hang_on: Option<(String, Cancellation)>,
    listing_hangs: bool,
    listing_trips: Option<Cancellation>,
    slow: HashMap<String, usize>,
    completed: Mutex<Vec<String>>,
    note_status: Option<u16>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeNodeStore {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Listing fails with this status and body.
    pub fn listing_fails(mut self, status: u16, body: &str) -> Self {
        self.listing_error = Some((status, body.to_string()));
        self
    }

    /// Writes to `node_id` come back with a non-success status.
    pub fn reject(mut self, node_id: &str, status: u16, body: &str) -> Self {
        self.rejected
            .insert(node_id.to_string(), (status, body.to_string()));
        self
    }

    /// Writes to `node_id` fail before reaching the store.
    pub fn unreachable(mut self, node_id: &str) -> Self {
        self.unreachable.insert(node_id.to_string());
        self
    }

    /// A write to `node_id` trips `cancellation` and never completes.
    pub fn hang_on(mut self, node_id: &str, cancellation: Cancellation) -> Self {
        self.hang_on = Some((node_id.to_string(), cancellation));
        self
    }

    /// Listing never resolves.
    pub fn listing_hangs(mut self) -> Self {
        self.listing_hangs = true;
        self
    }

    /// Listing trips `cancellation` and never resolves.
    pub fn listing_trips(mut self, cancellation: Cancellation) -> Self {
        self.listing_trips = Some(cancellation);
        self
    }

    /// Writes to `node_id` yield `extra` more times before completing.
    pub fn slow(mut self, node_id: &str, extra: usize) -> Self {
        self.slow.insert(node_id.to_string(), extra);
        self
    }

    pub fn note_status(mut self, status: u16) -> Self {
        self.note_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::List { .. }))
            .collect()
    }

    /// Node ids in the order their writes finished.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn write(&self, node_id: &str, echo: Value) -> ProxyResult<RemoteReply> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let extra = self.slow.get(node_id).copied().unwrap_or(0);
        for _ in 0..3 + extra {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some((hang_id, cancellation)) = &self.hang_on {
            if hang_id == node_id {
                cancellation.cancel();
                std::future::pending::<()>().await;
            }
        }
        self.completed.lock().unwrap().push(node_id.to_string());
        if self.unreachable.contains(node_id) {
            return Err(ProxyError::Decode("connection reset by peer".to_string()));
        }
        if let Some((status, body)) = self.rejected.get(node_id) {
            return Ok(RemoteReply::from_text(*status, body.clone()));
        }
        Ok(RemoteReply::new(200, echo))
    }
}

impl NodeStore for FakeNodeStore {
    async fn list_nodes(&self, job: &JobHandle) -> ProxyResult<Vec<Node>> {
        self.record(Call::List {
            job_id: job.job_id().to_string(),
        });
        if let Some(cancellation) = &self.listing_trips {
            cancellation.cancel();
        }
        if self.listing_hangs || self.listing_trips.is_some() {
            std::future::pending::<()>().await;
        }
        if let Some((status, body)) = &self.listing_error {
            return Err(ProxyError::Upstream {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(self.nodes.clone())
    }

    async fn update_node(
        &self,
        _job: &JobHandle,
        node_id: &str,
        body: &UpdateBody,
    ) -> ProxyResult<RemoteReply> {
        let body = serde_json::to_value(body).unwrap();
        self.record(Call::Update {
            node_id: node_id.to_string(),
            body: body.clone(),
        });
        self.write(node_id, json!({"id": node_id, "applied": body}))
            .await
    }

    async fn delete_node(&self, _job: &JobHandle, node_id: &str) -> ProxyResult<RemoteReply> {
        self.record(Call::Delete {
            node_id: node_id.to_string(),
        });
        self.write(node_id, json!({"deleted": node_id})).await
    }

    async fn create_note(&self, _job: &JobHandle, note: &NoteRequest) -> ProxyResult<RemoteReply> {
        let body = serde_json::to_value(note).unwrap();
        self.record(Call::Note { body: body.clone() });
        match self.note_status {
            Some(status) => Ok(RemoteReply::from_text(status, "note rejected".to_string())),
            None => Ok(RemoteReply::new(201, json!({"id": "note-1", "title": body["title"]}))),
        }
    }
}
