//! Fetch a job's nodes and keep the ones matching a filter set.

use std::sync::Arc;

use tracing::debug;

use crate::error::ProxyResult;
use crate::filter::{AttributeMatcher, FilterSet};
use crate::node::Node;
use crate::remote::{JobHandle, NodeStore};

#[derive(Debug)]
pub struct NodeQueryService<S> {
    store: Arc<S>,
    matcher: AttributeMatcher,
}

impl<S: NodeStore> NodeQueryService<S> {
    pub fn new(store: Arc<S>, matcher: AttributeMatcher) -> Self {
        Self { store, matcher }
    }

    pub fn matcher(&self) -> &AttributeMatcher {
        &self.matcher
    }

    /// Whole node collection of the job, unfiltered.
    pub async fn fetch_all(&self, job: &JobHandle) -> ProxyResult<Vec<Node>> {
        self.store.list_nodes(job).await
    }

    /// Matching nodes in upstream order. Upstream failures propagate as-is.
    pub async fn fetch_matching(
        &self,
        job: &JobHandle,
        filters: &FilterSet,
    ) -> ProxyResult<Vec<Node>> {
        let nodes = self.fetch_all(job).await?;
        let fetched = nodes.len();

        let matching: Vec<Node> = nodes
            .into_iter()
            .filter(|node| self.matcher.matches_node(node, filters))
            .collect();

        debug!(
            job_id = job.job_id(),
            fetched,
            matched = matching.len(),
            filters = filters.len(),
            "Filtered node collection"
        );
        Ok(matching)
    }
}
