//! Bulk mutation of matching nodes.
//!
//! [`planner`] decides what to send for each node, [`executor`] sends it and
//! records one [`NodeOutcome`] per node, [`summary`] folds the outcomes.

pub mod executor;
pub mod planner;
pub mod summary;

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ProxyError, ProxyResult};
use crate::node::Node;
use crate::remote::RemoteReply;

/// Mutation applied to every matching node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Add,
    Update,
    Remove,
    Delete,
    /// Any other name. Nodes are skipped and produce no outcome.
    Unrecognized(String),
}

impl Operation {
    pub fn parse(name: &str) -> Self {
        match name {
            "add" => Self::Add,
            "update" => Self::Update,
            "remove" => Self::Remove,
            "delete" => Self::Delete,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Delete => "delete",
            Self::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Attributes named by a mutation request.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetAttributes {
    /// Key -> new value, for add and update.
    Values(Map<String, Value>),
    /// Keys only, for remove.
    Keys(Vec<String>),
}

impl TargetAttributes {
    /// Parse a JSON object (`{"key": value}`) or a JSON array of keys.
    pub fn from_json(raw: &str, param: &str) -> ProxyResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProxyError::invalid(param, format!("not valid JSON: {}", e)))?;

        match value {
            Value::Object(values) => Ok(Self::Values(values)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(key) => Ok(key),
                    other => Err(ProxyError::invalid(
                        param,
                        format!("attribute keys must be strings, got {}", other),
                    )),
                })
                .collect::<ProxyResult<Vec<_>>>()
                .map(Self::Keys),
            _ => Err(ProxyError::invalid(
                param,
                "expected a JSON object or an array of keys",
            )),
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Values(values) => values.keys().map(String::as_str).collect(),
            Self::Keys(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    pub fn values(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Values(values) => Some(values),
            Self::Keys(_) => None,
        }
    }
}

/// What to do to each matching node.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    operation: Operation,
    target_attributes: TargetAttributes,
}

impl MutationRequest {
    /// Add and update need key/value pairs; the other operations accept
    /// either form.
    pub fn new(operation: Operation, target_attributes: TargetAttributes) -> ProxyResult<Self> {
        if matches!(operation, Operation::Add | Operation::Update)
            && target_attributes.values().is_none()
        {
            return Err(ProxyError::invalid(
                "new_attributes",
                format!("'{}' needs a JSON object of attribute values", operation),
            ));
        }
        Ok(Self {
            operation,
            target_attributes,
        })
    }

    pub fn add(values: Map<String, Value>) -> Self {
        Self {
            operation: Operation::Add,
            target_attributes: TargetAttributes::Values(values),
        }
    }

    pub fn update(values: Map<String, Value>) -> Self {
        Self {
            operation: Operation::Update,
            target_attributes: TargetAttributes::Values(values),
        }
    }

    pub fn remove<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            operation: Operation::Remove,
            target_attributes: TargetAttributes::Keys(keys.into_iter().map(Into::into).collect()),
        }
    }

    pub fn delete() -> Self {
        Self {
            operation: Operation::Delete,
            target_attributes: TargetAttributes::Keys(Vec::new()),
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn target_attributes(&self) -> &TargetAttributes {
        &self.target_attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The remote call succeeded.
    Applied,
    /// Nothing to send for this node.
    Unchanged,
    /// Transport failure or non-success response.
    Failed,
}

/// Result of mutating one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutcome {
    node_id: String,
    success: bool,
    status: OutcomeStatus,
    detail: Value,
}

impl NodeOutcome {
    /// Outcome for a node that needed no call; the detail is the node.
    pub fn unchanged(node: &Node) -> Self {
        Self {
            node_id: node.id().to_string(),
            success: true,
            status: OutcomeStatus::Unchanged,
            detail: node.to_value(),
        }
    }

    pub fn from_reply(node_id: impl Into<String>, reply: RemoteReply) -> Self {
        let success = reply.is_success();
        Self {
            node_id: node_id.into(),
            success,
            status: if success {
                OutcomeStatus::Applied
            } else {
                OutcomeStatus::Failed
            },
            detail: reply.body,
        }
    }

    pub fn failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            success: false,
            status: OutcomeStatus::Failed,
            detail: Value::String(message.into()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }
}
