//! Per-node mutation planning.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::node::{AttributeMap, AttributeValue, Node};

use super::{MutationRequest, Operation};

/// Body of a node update call. Serialises as a single-key object, e.g.
/// `{"add_attributes": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateBody {
    AddAttributes(Map<String, Value>),
    Attributes(AttributeMap),
    RemoveAttributes(Vec<String>),
}

/// The remote call to make for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMutation {
    Post(UpdateBody),
    Delete,
}

/// Computes the exact payload for each node. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationPlanner;

impl MutationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// `None` means there is nothing to send for this node.
    pub fn plan(&self, node: &Node, request: &MutationRequest) -> Option<NodeMutation> {
        let targets = request.target_attributes();
        match request.operation() {
            Operation::Add => {
                let values = targets.values()?;
                Some(NodeMutation::Post(UpdateBody::AddAttributes(values.clone())))
            }
            Operation::Update => {
                let updated = updated_attributes(node.attributes(), targets.values()?);
                if updated.is_empty() {
                    return None;
                }
                Some(NodeMutation::Post(UpdateBody::Attributes(updated)))
            }
            Operation::Remove => {
                let mut present: Vec<String> = Vec::new();
                for key in targets.keys() {
                    let set = node.attribute(key).is_some_and(|v| !v.is_null());
                    if set && !present.iter().any(|seen| seen == key) {
                        present.push(key.to_string());
                    }
                }
                if present.is_empty() {
                    return None;
                }
                Some(NodeMutation::Post(UpdateBody::RemoveAttributes(present)))
            }
            Operation::Delete => Some(NodeMutation::Delete),
            Operation::Unrecognized(_) => None,
        }
    }
}

/// Current attributes with `values` applied. Instanced keys receive the new
/// value on every instance; everything else is set directly.
fn updated_attributes(current: &AttributeMap, values: &Map<String, Value>) -> AttributeMap {
    let mut updated = current.clone();
    for (key, value) in values {
        updated
            .entry(key.clone())
            .or_insert(AttributeValue::Scalar(Value::Null))
            .broadcast(value.clone());
    }
    updated
}
