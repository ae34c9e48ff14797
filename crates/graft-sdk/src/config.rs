//! Registration configuration (graft.toml)
//!
//! ```toml
//! truthiness = "always-true"
//!
//! [types."vec.Vec"]
//! name = "vec.Vector"
//! doc = "A 3D vector"
//! truthiness = "unsupported"
//! ```
//!
//! Per-type tables are keyed by the extension's default name and applied by
//! [`TypeBuilder::configure`](crate::TypeBuilder::configure).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Truth value of instances of a kind with no bool conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Truthiness {
    /// Truth testing raises a `TypeError`
    #[default]
    Unsupported,
    /// Every instance is true
    AlwaysTrue,
}

/// Overrides for one extension type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeOverrides {
    /// Host-visible name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Docstring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Truthiness of this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truthiness: Option<Truthiness>,
}

/// Registration defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Process-wide truthiness default
    #[serde(default)]
    pub truthiness: Truthiness,

    /// Per-type overrides, keyed by default name
    #[serde(default)]
    pub types: HashMap<String, TypeOverrides>,
}

impl Config {
    /// Parse a config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from a string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        tracing::debug!(
            truthiness = ?config.truthiness,
            types = config.types.len(),
            "config loaded"
        );
        Ok(config)
    }
}

static GLOBAL: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// Replace the process default used by [`register_type`](crate::register_type)
pub fn set_global(config: Config) {
    *GLOBAL.write() = config;
}

/// Snapshot of the process default
pub fn global() -> Config {
    GLOBAL.read().clone()
}
