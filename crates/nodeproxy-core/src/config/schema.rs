//! Configuration schema for nodeproxy.toml
//!
//! ```toml
//! base_url = "https://dcs.katapultpro.com/api/v3"
//! default_job_id = "-OT77Az4JJlgEgQOASe0"
//! concurrency = 4
//! timeout_secs = 30
//! instance_resolution = "first"
//!
//! [note]
//! title = "Filtered nodes"
//! note_type = "general"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mutation::executor::DEFAULT_CONCURRENCY;
use crate::node::InstanceResolution;
use crate::remote::http::DEFAULT_BASE_URL;

/// Root configuration structure for nodeproxy.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeproxyConfig {
    /// Remote node store API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Job used by read-only routes when the request names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_job_id: Option<String>,

    /// Maximum concurrent per-node calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upstream request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How instanced attributes collapse for filtering
    #[serde(default)]
    pub instance_resolution: InstanceResolution,

    /// Defaults for posted notes
    #[serde(default)]
    pub note: NoteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteConfig {
    #[serde(default = "default_note_title")]
    pub title: String,

    #[serde(default = "default_note_type")]
    pub note_type: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_note_title() -> String {
    "Filtered nodes".to_string()
}

fn default_note_type() -> String {
    "general".to_string()
}

impl Default for NodeproxyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_job_id: None,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            instance_resolution: InstanceResolution::default(),
            note: NoteConfig::default(),
        }
    }
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            title: default_note_title(),
            note_type: default_note_type(),
        }
    }
}

impl NodeproxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("base_url '{}' is not a valid URL: {}", self.base_url, e))?;
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if self
            .default_job_id
            .as_deref()
            .is_some_and(|job_id| job_id.trim().is_empty())
        {
            anyhow::bail!("default_job_id must not be empty when set");
        }
        if self.note.title.trim().is_empty() {
            anyhow::bail!("note.title must not be empty");
        }
        Ok(())
    }
}
