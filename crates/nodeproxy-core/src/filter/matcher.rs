//! Attribute predicate matching.

use crate::node::{AttributeMap, InstanceResolution, Node, Resolved};

use super::FilterSet;

/// Decides whether a node's attributes satisfy a [`FilterSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMatcher {
    resolution: InstanceResolution,
}

impl AttributeMatcher {
    pub fn new(resolution: InstanceResolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> InstanceResolution {
        self.resolution
    }

    /// True when every filter holds. An empty filter set matches everything.
    pub fn matches(&self, attributes: &AttributeMap, filters: &FilterSet) -> bool {
        filters.iter().all(|(key, required)| {
            let actual = match attributes.get(key) {
                None => Resolved::Value(None),
                Some(value) => value.resolve_for_comparison(self.resolution),
            };
            match actual {
                Resolved::Value(actual) => actual.as_deref() == required,
                Resolved::Conflict => false,
            }
        })
    }

    pub fn matches_node(&self, node: &Node, filters: &FilterSet) -> bool {
        self.matches(node.attributes(), filters)
    }
}
