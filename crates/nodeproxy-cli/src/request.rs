//! Translate command-line arguments into route parameters.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use nodeproxy_core::service::params::{
    API_KEY, ATTRIBUTE_FILTERS, JOB_ID, NEW_ATTRIBUTES, NOTE_TYPE, OPERATION, Params, TITLE,
};

/// Builder for the flat parameter map a route consumes.
#[derive(Debug, Default)]
pub struct ParamsBuilder {
    params: Params,
}

impl ParamsBuilder {
    pub fn new(api_key: Option<&str>) -> Self {
        let mut builder = Self::default();
        builder.set(API_KEY, api_key);
        builder
    }

    pub fn job_id(mut self, job_id: Option<&str>) -> Self {
        self.set(JOB_ID, job_id);
        self
    }

    /// `--filters` JSON merged with `--where KEY=VALUE` pairs, later pairs
    /// winning. Nothing is set when neither is given.
    pub fn filters(mut self, json: Option<&str>, pairs: &[String]) -> Result<Self> {
        if json.is_none() && pairs.is_empty() {
            return Ok(self);
        }

        let mut filters = match json {
            Some(raw) => match serde_json::from_str::<Value>(raw)
                .context("--filters is not valid JSON")?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("--filters must be a JSON object"),
            },
            None => Map::new(),
        };
        for pair in pairs {
            let (key, value) = parse_assignment(pair)?;
            filters.insert(key, Value::String(value));
        }

        self.params
            .insert(ATTRIBUTE_FILTERS.to_string(), Value::Object(filters).to_string());
        Ok(self)
    }

    pub fn attributes(mut self, json: Option<&str>) -> Self {
        self.set(NEW_ATTRIBUTES, json);
        self
    }

    pub fn operation(mut self, operation: Option<&str>) -> Self {
        self.set(OPERATION, operation);
        self
    }

    pub fn note(mut self, title: Option<&str>, note_type: Option<&str>) -> Self {
        self.set(TITLE, title);
        self.set(NOTE_TYPE, note_type);
        self
    }

    pub fn build(self) -> Params {
        self.params
    }

    fn set(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.params.insert(name.to_string(), value.to_string());
        }
    }
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_assignment(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got '{}'", pair))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Empty key in '{}'", pair);
    }
    Ok((key.to_string(), value.to_string()))
}
