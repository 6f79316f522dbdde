//! Node error type.

use crate::transport::NetworkError;
use powchain_chain::MiningError;
use powchain_consensus::ValidationError;
use powchain_storage::PersistenceError;
use thiserror::Error;

/// Errors surfaced by [`Node`](crate::Node) operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("background worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
