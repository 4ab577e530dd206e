//! Job notes summarising filter results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filter::FilterSet;
use crate::node::Node;

/// Body of `POST /jobs/{job}/notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRequest {
    pub text: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub title: String,
}

impl NoteRequest {
    /// Note listing the ids of the nodes that matched `filters`.
    pub fn for_matches(
        title: impl Into<String>,
        note_type: impl Into<String>,
        nodes: &[Node],
        filters: &FilterSet,
        at: DateTime<Utc>,
    ) -> Self {
        let filter_desc = if filters.is_empty() {
            "no filters".to_string()
        } else {
            filters
                .iter()
                .map(|(key, value)| format!("{}={}", key, value.unwrap_or("null")))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut text = format!(
            "{} node(s) matched {} at {}",
            nodes.len(),
            filter_desc,
            at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for node in nodes {
            text.push_str("\n- ");
            text.push_str(node.id());
        }

        Self {
            text,
            note_type: note_type.into(),
            title: title.into(),
        }
    }
}
