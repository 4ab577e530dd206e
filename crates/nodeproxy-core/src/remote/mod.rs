//! Remote node store interface.
//!
//! [`NodeStore`] is the seam between the engine and the upstream API.
//! [`http::HttpNodeStore`] talks to the real service; tests substitute an
//! in-memory store.

pub mod http;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ProxyResult;
use crate::mutation::planner::UpdateBody;
use crate::node::Node;
use crate::notes::NoteRequest;

/// Job id plus the credentials used for every call against that job.
#[derive(Clone, PartialEq, Eq)]
pub struct JobHandle {
    job_id: Arc<str>,
    api_key: Arc<str>,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            job_id: Arc::from(job_id.into()),
            api_key: Arc::from(api_key.into()),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Status and body of a write call. The body is parsed JSON when possible,
/// otherwise the raw text as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReply {
    pub status: u16,
    pub body: Value,
}

impl RemoteReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn from_text(status: u16, text: String) -> Self {
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Operations the engine needs from the remote node store.
///
/// `list_nodes` fails with [`crate::error::ProxyError::Upstream`] on a
/// non-success status. The write calls only fail on transport errors; a
/// non-success status comes back as a [`RemoteReply`] so the caller can
/// record it per node.
pub trait NodeStore: Send + Sync {
    fn list_nodes(&self, job: &JobHandle) -> impl Future<Output = ProxyResult<Vec<Node>>> + Send;

    fn update_node(
        &self,
        job: &JobHandle,
        node_id: &str,
        body: &UpdateBody,
    ) -> impl Future<Output = ProxyResult<RemoteReply>> + Send;

    fn delete_node(
        &self,
        job: &JobHandle,
        node_id: &str,
    ) -> impl Future<Output = ProxyResult<RemoteReply>> + Send;

    fn create_note(
        &self,
        job: &JobHandle,
        note: &NoteRequest,
    ) -> impl Future<Output = ProxyResult<RemoteReply>> + Send;
}
