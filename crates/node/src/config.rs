//! Node configuration.

use powchain_chain::ChainConfig;
use powchain_storage::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Settings for one node process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identifies this node's state file (`blockchain-{node_id}.txt`).
    pub node_id: String,
    /// Directory holding the config, state file and wallet keys.
    pub data_dir: PathBuf,
    #[serde(default)]
    pub chain: ChainConfig,
    /// Per-request timeout for peer calls.
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout_secs: u64,
}

fn default_peer_timeout() -> u64 {
    5
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "5000".into(),
            data_dir: PathBuf::from("./powchain_data"),
            chain: ChainConfig::default(),
            peer_timeout_secs: default_peer_timeout(),
        }
    }
}

impl NodeConfig {
    /// A default configuration rooted at `data_dir`.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    /// `{data_dir}/config.json`
    pub fn path_in<P: AsRef<Path>>(data_dir: P) -> PathBuf {
        data_dir.as_ref().join(CONFIG_FILE)
    }

    /// Read `config.json` from `data_dir`.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let text = fs::read_to_string(Self::path_in(data_dir))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write `config.json` into the configured data directory.
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)?;
        let path = Self::path_in(&self.data_dir);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
