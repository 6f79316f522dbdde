//! Three-line JSON state file.

use powchain_core::{Block, Transaction};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persistence errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed state file: {0}")]
    Malformed(String),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Everything a node persists between runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistedState {
    pub chain: Vec<Block>,
    pub open_transactions: Vec<Transaction>,
    pub peers: Vec<String>,
}

impl PersistedState {
    /// Render the three JSON lines. The last line has no trailing newline.
    pub fn encode(&self) -> Result<String> {
        Ok(format!(
            "{}\n{}\n{}",
            serde_json::to_string(&self.chain)?,
            serde_json::to_string(&self.open_transactions)?,
            serde_json::to_string(&self.peers)?,
        ))
    }

    /// Parse the three JSON lines written by [`encode`](Self::encode).
    pub fn decode(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let mut next_line = |what: &str| {
            lines
                .next()
                .ok_or_else(|| PersistenceError::Malformed(format!("missing {what} line")))
        };

        let chain: Vec<Block> = serde_json::from_str(next_line("chain")?)?;
        let open_transactions = serde_json::from_str(next_line("transactions")?)?;
        let peers = serde_json::from_str(next_line("peers")?)?;

        if chain.is_empty() {
            return Err(PersistenceError::Malformed("chain is empty".into()));
        }

        Ok(Self {
            chain,
            open_transactions,
            peers,
        })
    }
}

/// Location of a node's state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `{data_dir}/blockchain-{node_id}.txt`
    pub fn for_node<P: AsRef<Path>>(data_dir: P, node_id: &str) -> Self {
        Self::new(data_dir.as_ref().join(format!("blockchain-{node_id}.txt")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        PersistedState::decode(&text).map(Some)
    }

    /// Write the state file through a temporary sibling and a rename, so a
    /// reader never sees a partially written file.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, state.encode()?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// `blockchain-{node_id}.conflicts` next to the state file. Its presence
    /// means a peer reported a conflicting chain that is not yet resolved.
    pub fn conflicts_path(&self) -> PathBuf {
        self.path.with_extension("conflicts")
    }

    pub fn load_conflicts_pending(&self) -> bool {
        self.conflicts_path().exists()
    }

    /// Create or remove the conflicts marker.
    pub fn save_conflicts_pending(&self, pending: bool) -> Result<()> {
        let path = self.conflicts_path();
        if pending {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, b"")?;
            return Ok(());
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
