//! configuration types for meshgate

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// maximum size for a rule-list document in bytes (1MB)
pub const MAX_POLICY_SIZE: usize = 1024 * 1024;

/// main configuration for the access core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// json file holding the compiled rule list, read on reload.
    pub policy_path: Option<PathBuf>,

    /// rule-list documents larger than this are rejected before parsing.
    pub max_policy_size: usize,

    /// how the node store treats a node with repeated addresses.
    pub duplicate_addresses: DuplicateAddresses,

    /// emit a debug event when a node with no addresses is stored or evaluated.
    pub log_empty_addresses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_path: None,
            max_policy_size: MAX_POLICY_SIZE,
            duplicate_addresses: DuplicateAddresses::default(),
            log_empty_addresses: true,
        }
    }
}

/// handling of repeated addresses within one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAddresses {
    /// store the node with duplicates collapsed.
    #[default]
    Dedup,
    /// refuse to store the node.
    Reject,
}

impl Config {
    /// parse a config from toml text. missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// read and parse a toml config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
