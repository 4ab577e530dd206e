//! Nodeproxy Core Library
//!
//! Filters the nodes of a remote job by attribute and applies bulk
//! attribute mutations to the matching subset, tolerating both the scalar
//! and the instance-keyed attribute encodings of the upstream store.

pub mod config;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod node;
pub mod notes;
pub mod query;
pub mod remote;
pub mod service;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, NodeproxyConfig, NoteConfig};

    // Errors
    pub use crate::error::{ProxyError, ProxyResult};

    // Nodes and filters
    pub use crate::filter::{AttributeMatcher, FilterSet, InstanceResolution};
    pub use crate::node::{AttributeMap, AttributeValue, Node};

    // Remote store
    pub use crate::remote::http::HttpNodeStore;
    pub use crate::remote::{JobHandle, NodeStore, RemoteReply};

    // Mutations
    pub use crate::mutation::executor::{BulkExecutor, Cancellation, Execution};
    pub use crate::mutation::planner::{MutationPlanner, NodeMutation, UpdateBody};
    pub use crate::mutation::summary::MutationSummary;
    pub use crate::mutation::{MutationRequest, NodeOutcome, Operation, OutcomeStatus};

    // Services
    pub use crate::query::NodeQueryService;
    pub use crate::service::{ProxyResponse, ProxyService, Route};
}
