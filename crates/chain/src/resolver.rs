//! Longest-valid-chain conflict resolution.

use powchain_consensus::ChainValidator;
use powchain_core::Block;
use tracing::{debug, warn};

/// Outcome of a resolution round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Whether the local chain was replaced.
    pub replaced: bool,
    /// Peer whose chain was adopted, if any.
    pub adopted_from: Option<String>,
    /// Length of the chain after resolution.
    pub length: usize,
}

/// A chain fetched from a peer, or `None` if the peer could not be reached.
pub type Candidate = (String, Option<Vec<Block>>);

/// Selects the longest valid chain among candidates.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Pick the winning chain among `candidates`, starting from `local`.
    ///
    /// A candidate only wins if it is strictly longer than the current winner
    /// and passes full chain validation; equal length never replaces.
    /// Returns the winning peer and its chain, or `None` to keep `local`.
    pub fn select_longest_valid<I>(
        local_len: usize,
        candidates: I,
        difficulty: usize,
    ) -> Option<(String, Vec<Block>)>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut best_len = local_len;
        let mut winner = None;

        for (peer, fetched) in candidates {
            let Some(chain) = fetched else {
                debug!(%peer, "skipping unreachable peer");
                continue;
            };
            if chain.len() <= best_len {
                debug!(%peer, length = chain.len(), best_len, "peer chain is not longer");
                continue;
            }
            if let Err(e) = ChainValidator::check_chain(&chain, difficulty) {
                warn!(%peer, error = %e, "peer chain failed validation");
                continue;
            }
            best_len = chain.len();
            winner = Some((peer, chain));
        }

        winner
    }

    /// Run resolution with a synchronous fetcher.
    ///
    /// Returns the adopted chain and the peer it came from, if any.
    pub fn resolve<'a, P, F>(
        local_len: usize,
        peers: P,
        mut fetch_chain: F,
        difficulty: usize,
    ) -> Option<(String, Vec<Block>)>
    where
        P: IntoIterator<Item = &'a String>,
        F: FnMut(&str) -> Option<Vec<Block>>,
    {
        let candidates = peers
            .into_iter()
            .map(|peer| (peer.clone(), fetch_chain(peer.as_str())));
        Self::select_longest_valid(local_len, candidates, difficulty)
    }
}
