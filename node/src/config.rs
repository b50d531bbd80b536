//! Node configuration with TOML file support.

use crate::NodeError;
use rota_types::ChainParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a rota node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so
/// a partial file overrides only what it names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Forging secret for this node's delegate identity. Absent means the
    /// node never forges, only relays and syncs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forging_secret: Option<String>,

    /// Known peer addresses (`"ip:port"`) to track on startup.
    #[serde(default)]
    pub peers: Vec<String>,

    /// Consensus parameters. Defaults to mainnet.
    #[serde(default)]
    pub params: ChainParams,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            forging_secret: None,
            peers: Vec::new(),
            params: ChainParams::default(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("invalid TOML config: {e}")))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self)
            .map_err(|e| NodeError::Config(format!("cannot serialize config: {e}")))
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
