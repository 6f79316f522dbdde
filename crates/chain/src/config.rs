//! Process-wide chain parameters.

use serde::{Deserialize, Serialize};

/// Reward and difficulty shared by every block this node mines or checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Amount credited to the miner of each block.
    pub mining_reward: f64,
    /// Required number of leading hex zeros in a proof digest.
    pub difficulty: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mining_reward: 10.0,
            difficulty: 2,
        }
    }
}
