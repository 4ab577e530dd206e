//! Config store for loading and saving nodeproxy.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{NodeproxyConfig, parser};

pub const CONFIG_FILE_NAME: &str = "nodeproxy.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at `<config dir>/nodeproxy/nodeproxy.toml`.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("nodeproxy");
        Ok(Self::from_path(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// A missing file yields the default configuration.
    pub fn load(&self) -> anyhow::Result<NodeproxyConfig> {
        if !self.config_path.exists() {
            return Ok(NodeproxyConfig::new());
        }
        parser::parse_config(&self.config_path)
    }

    pub fn save(&self, config: &NodeproxyConfig) -> anyhow::Result<()> {
        config.validate().context("Refusing to save invalid configuration")?;
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
