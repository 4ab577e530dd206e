//! Configuration for the proxy
//!
//! A single TOML file holds the upstream location, the bulk call pool size
//! and the filter resolution policy. Every setting has a default, so a
//! missing file is valid.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_config, parse_config_str, to_toml};
pub use schema::{NodeproxyConfig, NoteConfig};
pub use store::{CONFIG_FILE_NAME, ConfigStore};
