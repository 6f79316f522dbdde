//! Spendable balance accounting.

use crate::pool::TransactionPool;
use powchain_core::{Block, Identity};

/// Computes balances from the committed chain and the pending pool.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Everything received on chain, minus everything sent on chain and
    /// everything pending in the pool.
    ///
    /// Pending debits count immediately; pending credits do not.
    pub fn balance(participant: &Identity, chain: &[Block], pool: &TransactionPool) -> f64 {
        let (received, sent) = Self::committed_flows(participant, chain);
        received - (sent + pool.pending_debits(participant))
    }

    /// Total `(received, sent)` by `participant` across committed blocks.
    pub fn committed_flows(participant: &Identity, chain: &[Block]) -> (f64, f64) {
        chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .fold((0.0, 0.0), |(received, sent), tx| {
                let received = if &tx.recipient == participant {
                    received + tx.amount
                } else {
                    received
                };
                let sent = if &tx.sender == participant {
                    sent + tx.amount
                } else {
                    sent
                };
                (received, sent)
            })
    }
}
