//! Persisted node state for powchain.
//!
//! A node keeps its whole state in one text file, `blockchain-{node_id}.txt`,
//! holding three newline-separated JSON documents:
//!
//! ```text
//! [{"index":0,"previous_hash":"","transactions":[],"proof_number":100,"timestamp":0.0}, ...]
//! [{"sender":"...","recipient":"...","amount":1.5,"signature":"..."}, ...]
//! ["localhost:5001", ...]
//! ```
//!
//! The first line is the committed chain, the second the pending pool and the
//! third the peer set. An unresolved chain conflict is recorded separately by
//! an empty `blockchain-{node_id}.conflicts` marker file.
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_core::Block;
//! use powchain_storage::{PersistedState, StateFile};
//!
//! let file = StateFile::for_node("./powchain_data", "5000");
//! let state = PersistedState {
//!     chain: vec![Block::genesis()],
//!     open_transactions: vec![],
//!     peers: vec!["localhost:5001".into()],
//! };
//! file.save(&state).unwrap();
//!
//! let loaded = file.load().unwrap().unwrap();
//! assert_eq!(loaded, state);
//! ```

pub mod state_file;

// Re-export commonly used types
pub use state_file::{PersistedState, PersistenceError, Result, StateFile};
