//! Request parameter extraction.

use std::collections::HashMap;

use crate::error::{ProxyError, ProxyResult};
use crate::filter::FilterSet;
use crate::mutation::{MutationRequest, Operation, TargetAttributes};

pub type Params = HashMap<String, String>;

pub const API_KEY: &str = "api_key";
pub const JOB_ID: &str = "job_id";
pub const ATTRIBUTE_FILTERS: &str = "attribute_filters";
pub const NEW_ATTRIBUTES: &str = "new_attributes";
pub const OPERATION: &str = "operation";
pub const TITLE: &str = "title";
pub const NOTE_TYPE: &str = "note_type";

/// Parameters that are never treated as loose filters.
const RESERVED: &[&str] = &[
    API_KEY,
    JOB_ID,
    ATTRIBUTE_FILTERS,
    NEW_ATTRIBUTES,
    OPERATION,
    TITLE,
    NOTE_TYPE,
];

pub fn optional<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Fails with every missing name at once.
pub fn require_all(params: &Params, names: &[&str]) -> ProxyResult<()> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| optional(params, name).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProxyError::MissingParameter(missing.join(", ")))
    }
}

pub fn required<'a>(params: &'a Params, name: &str) -> ProxyResult<&'a str> {
    optional(params, name).ok_or_else(|| ProxyError::MissingParameter(name.to_string()))
}

/// `attribute_filters` JSON when given, otherwise every non-reserved
/// parameter.
pub fn filters(params: &Params) -> ProxyResult<FilterSet> {
    match optional(params, ATTRIBUTE_FILTERS) {
        Some(raw) => FilterSet::from_json(raw, ATTRIBUTE_FILTERS),
        None => Ok(FilterSet::from_params(params, RESERVED)),
    }
}

pub fn required_filters(params: &Params) -> ProxyResult<FilterSet> {
    FilterSet::from_json(required(params, ATTRIBUTE_FILTERS)?, ATTRIBUTE_FILTERS)
}

/// Mutation from `operation` (default `add`) and `new_attributes`.
///
/// Deleting is its own route, so `delete` here is just an unknown name.
pub fn mutation(params: &Params) -> ProxyResult<MutationRequest> {
    let operation = match Operation::parse(optional(params, OPERATION).unwrap_or("add")) {
        Operation::Delete => Operation::Unrecognized("delete".to_string()),
        other => other,
    };
    let targets = TargetAttributes::from_json(required(params, NEW_ATTRIBUTES)?, NEW_ATTRIBUTES)?;
    MutationRequest::new(operation, targets)
}
