//! Aggregate report of a bulk mutation.

use serde::Serialize;

use super::{NodeOutcome, Operation};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub operation: Operation,
    pub job_id: String,
    /// Set when the run was cut short; `outcomes` then holds only the calls
    /// that finished.
    pub cancelled: bool,
    pub outcomes: Vec<NodeOutcome>,
}

impl MutationSummary {
    pub fn summarize(
        outcomes: Vec<NodeOutcome>,
        operation: Operation,
        job_id: impl Into<String>,
    ) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success()).count();
        Self {
            total: outcomes.len(),
            success_count,
            failure_count: outcomes.len() - success_count,
            operation,
            job_id: job_id.into(),
            cancelled: false,
            outcomes,
        }
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn failed(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }
}
