//! Shared test fixtures.

#![allow(dead_code)]

pub mod store;

use nodeproxy_core::node::Node;
use serde_json::Value;

/// Nodes from a JSON array of node objects.
pub fn nodes(raw: Value) -> Vec<Node> {
    serde_json::from_value(raw).expect("valid node fixtures")
}

pub fn object(raw: Value) -> serde_json::Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
