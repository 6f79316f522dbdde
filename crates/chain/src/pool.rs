//! Pool of unconfirmed transactions.
//!
//! The pool keeps submitted transactions in insertion order until they are
//! committed in a block, either one mined locally or one accepted from a peer.

use powchain_consensus::{ChainValidator, ValidationError};
use powchain_core::{Identity, SignatureVerifier, Transaction};

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Insertion-ordered transaction pool.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from persisted transactions, keeping their order.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.transactions.contains(tx)
    }

    /// Borrow the pending transactions in insertion order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Validate a transaction and append it on success.
    ///
    /// Rejected transactions are discarded; the pool is left unchanged.
    pub fn submit<F>(
        &mut self,
        tx: Transaction,
        verifier: &dyn SignatureVerifier,
        balance_of: F,
        require_funds: bool,
    ) -> Result<()>
    where
        F: Fn(&Identity) -> f64,
    {
        if tx.is_reward() {
            return Err(ValidationError::RewardNotAllowed);
        }
        if !tx.has_valid_amount() {
            return Err(ValidationError::InvalidAmount(tx.amount));
        }
        if self.contains(&tx) {
            return Err(ValidationError::DuplicateTransaction);
        }

        ChainValidator::check_transaction(&tx, verifier, balance_of, require_funds)?;
        self.transactions.push(tx);
        Ok(())
    }

    /// Drop every pooled transaction that appears in `committed`.
    ///
    /// Returns how many entries were removed. Calling it again with the same
    /// input removes nothing.
    pub fn reconcile(&mut self, committed: &[Transaction]) -> usize {
        let before = self.transactions.len();
        self.transactions.retain(|tx| !committed.contains(tx));
        before - self.transactions.len()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }

    /// Owned copy of the pending transactions.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Sum of the amounts `sender` has pending in the pool.
    pub fn pending_debits(&self, sender: &Identity) -> f64 {
        self.transactions
            .iter()
            .filter(|tx| &tx.sender == sender)
            .map(|tx| tx.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::{Ed25519Verifier, Keypair, WalletSigner};

    fn signed(kp: &Keypair, to: &str, amount: f64) -> Transaction {
        kp.signed_transaction(Identity::new(to), amount)
    }

    #[test]
    fn test_submit_and_snapshot() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();
        let tx = signed(&kp, "bob", 3.0);

        pool.submit(tx.clone(), &Ed25519Verifier, |_| 10.0, true).unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.snapshot(), vec![tx]);
    }

    #[test]
    fn test_submit_keeps_insertion_order() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();
        let first = signed(&kp, "bob", 1.0);
        let second = signed(&kp, "carol", 2.0);

        pool.submit(first.clone(), &Ed25519Verifier, |_| 0.0, false).unwrap();
        pool.submit(second.clone(), &Ed25519Verifier, |_| 0.0, false).unwrap();

        assert_eq!(pool.transactions(), &[first, second]);
    }

    #[test]
    fn test_submit_rejects_insufficient_funds() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();

        let result = pool.submit(signed(&kp, "bob", 11.0), &Ed25519Verifier, |_| 10.0, true);
        assert!(matches!(result, Err(ValidationError::InsufficientFunds { .. })));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_submit_without_funds_check() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();

        pool.submit(signed(&kp, "bob", 11.0), &Ed25519Verifier, |_| 0.0, false).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_submit_rejects_bad_signature() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();
        let mut tx = signed(&kp, "bob", 1.0);
        tx.amount = 2.0;

        assert_eq!(
            pool.submit(tx, &Ed25519Verifier, |_| 10.0, false),
            Err(ValidationError::InvalidSignature)
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn test_submit_rejects_reward_sender() {
        let mut pool = TransactionPool::new();
        let tx = Transaction::reward(Identity::new("mallory"), 10.0);

        assert_eq!(
            pool.submit(tx, &Ed25519Verifier, |_| 0.0, false),
            Err(ValidationError::RewardNotAllowed)
        );
    }

    #[test]
    fn test_submit_rejects_invalid_amount() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();

        let result = pool.submit(signed(&kp, "bob", -1.0), &Ed25519Verifier, |_| 10.0, true);
        assert_eq!(result, Err(ValidationError::InvalidAmount(-1.0)));

        let result = pool.submit(signed(&kp, "bob", f64::INFINITY), &Ed25519Verifier, |_| 0.0, false);
        assert!(matches!(result, Err(ValidationError::InvalidAmount(_))));
    }

    #[test]
    fn test_submit_rejects_duplicate() {
        let mut pool = TransactionPool::new();
        let kp = Keypair::generate();
        let tx = signed(&kp, "bob", 1.0);

        pool.submit(tx.clone(), &Ed25519Verifier, |_| 10.0, true).unwrap();
        assert_eq!(
            pool.submit(tx, &Ed25519Verifier, |_| 10.0, true),
            Err(ValidationError::DuplicateTransaction)
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let kp = Keypair::generate();
        let a = signed(&kp, "bob", 1.0);
        let b = signed(&kp, "carol", 2.0);
        let c = signed(&kp, "dave", 3.0);
        let mut pool = TransactionPool::from_transactions(vec![a.clone(), b.clone(), c.clone()]);

        let committed = vec![b, signed(&kp, "erin", 9.0)];
        assert_eq!(pool.reconcile(&committed), 1);
        assert_eq!(pool.snapshot(), vec![a.clone(), c.clone()]);

        assert_eq!(pool.reconcile(&committed), 0);
        assert_eq!(pool.snapshot(), vec![a, c]);
    }

    #[test]
    fn test_pending_debits() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let pool = TransactionPool::from_transactions(vec![
            signed(&alice, "x", 1.5),
            signed(&bob, "x", 4.0),
            signed(&alice, "y", 2.0),
        ]);

        assert_eq!(pool.pending_debits(&alice.identity()), 3.5);
        assert_eq!(pool.pending_debits(&bob.identity()), 4.0);
        assert_eq!(pool.pending_debits(&Identity::new("nobody")), 0.0);
    }

    #[test]
    fn test_clear() {
        let kp = Keypair::generate();
        let mut pool = TransactionPool::from_transactions(vec![signed(&kp, "bob", 1.0)]);
        pool.clear();
        assert!(pool.is_empty());
    }
}
