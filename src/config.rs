use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;
use crate::consensus::quorum::QuorumParams;

/// Static cluster configuration handed to the quorum store at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Number of nodes in the cluster.
    pub node_count: usize,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        QuorumConfig { node_count: 4 }
    }
}

impl QuorumConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.params()?;
        Ok(config)
    }

    pub fn params(&self) -> Result<QuorumParams, ConfigError> {
        Ok(QuorumParams::new(self.node_count)?)
    }
}
