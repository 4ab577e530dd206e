//! Fan-out of per-node mutation calls.
//!
//! Calls run on a bounded pool. Every node gets its own outcome and a
//! failure on one node never stops the others.

use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::node::Node;
use crate::remote::{JobHandle, NodeStore};

use super::planner::{MutationPlanner, NodeMutation};
use super::{MutationRequest, NodeOutcome};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Request-scoped cancellation flag.
///
/// Clones share the flag. Cancelling aborts calls that are in flight or not
/// yet issued; outcomes already collected are kept.
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcomes of a bulk run, in input node order.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub outcomes: Vec<NodeOutcome>,
    pub cancelled: bool,
}

/// Applies a [`MutationRequest`] to a list of nodes.
#[derive(Debug)]
pub struct BulkExecutor<S> {
    store: Arc<S>,
    planner: MutationPlanner,
    concurrency: usize,
}

impl<S> BulkExecutor<S>
where
    S: NodeStore + 'static,
{
    pub fn new(store: Arc<S>, concurrency: usize) -> Self {
        Self {
            store,
            planner: MutationPlanner::new(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn execute(
        &self,
        nodes: Vec<Node>,
        job: &JobHandle,
        request: &MutationRequest,
    ) -> Vec<NodeOutcome> {
        self.execute_until(nodes, job, request, &Cancellation::new())
            .await
            .outcomes
    }

    pub async fn execute_until(
        &self,
        nodes: Vec<Node>,
        job: &JobHandle,
        request: &MutationRequest,
        cancellation: &Cancellation,
    ) -> Execution {
        if !request.operation().is_recognized() {
            debug!(
                operation = %request.operation(),
                "Unrecognized operation, skipping all nodes"
            );
            return Execution {
                outcomes: Vec::new(),
                cancelled: false,
            };
        }

        let mut slots: Vec<Option<NodeOutcome>> = vec![None; nodes.len()];
        let mut issued = vec![false; nodes.len()];
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut cancelled = cancellation.is_cancelled();

        for (index, node) in nodes.iter().enumerate() {
            match self.planner.plan(node, request) {
                None => slots[index] = Some(NodeOutcome::unchanged(node)),
                Some(_) if cancelled => {}
                Some(mutation) => {
                    issued[index] = true;
                    let store = Arc::clone(&self.store);
                    let semaphore = Arc::clone(&semaphore);
                    let job = job.clone();
                    let node_id = node.id().to_string();
                    tasks.spawn(async move {
                        let _permit = semaphore.acquire_owned().await;
                        (index, apply(store.as_ref(), &job, &node_id, mutation).await)
                    });
                }
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled(), if !cancelled => {
                    warn!(job_id = job.job_id(), "Bulk mutation cancelled, aborting pending calls");
                    cancelled = true;
                    tasks.abort_all();
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, outcome))) => slots[index] = Some(outcome),
                    Some(Err(err)) if err.is_cancelled() => {}
                    Some(Err(err)) => error!(error = %err, "Node mutation task panicked"),
                },
            }
        }

        let outcomes = nodes
            .iter()
            .zip(slots)
            .zip(issued)
            .filter_map(|((node, slot), issued)| match slot {
                Some(outcome) => Some(outcome),
                None if issued && !cancelled => Some(NodeOutcome::failed(
                    node.id().to_string(),
                    "mutation task terminated unexpectedly",
                )),
                None => None,
            })
            .collect();

        Execution {
            outcomes,
            cancelled,
        }
    }
}

async fn apply<S: NodeStore>(
    store: &S,
    job: &JobHandle,
    node_id: &str,
    mutation: NodeMutation,
) -> NodeOutcome {
    let reply = match &mutation {
        NodeMutation::Post(body) => store.update_node(job, node_id, body).await,
        NodeMutation::Delete => store.delete_node(job, node_id).await,
    };

    match reply {
        Ok(reply) => {
            let outcome = NodeOutcome::from_reply(node_id, reply);
            if !outcome.success() {
                warn!(node_id, detail = %outcome.detail(), "Node mutation rejected upstream");
            }
            outcome
        }
        Err(err) => {
            warn!(node_id, error = %err, "Node mutation failed");
            NodeOutcome::failed(node_id, err.to_string())
        }
    }
}
