//! Transaction types and their canonical encoding.

use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender value marking a mining-reward transaction.
pub const REWARD_SENDER: &str = "REWARD";

/// An opaque participant identity (the hex encoding of a public key).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel sender of mining-reward transactions.
    pub fn reward() -> Self {
        Self(REWARD_SENDER.to_string())
    }

    /// Check if this is the reward sentinel.
    pub fn is_reward(&self) -> bool {
        self.0 == REWARD_SENDER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines and terminal output.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(16);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.short())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Hex (de)serialization for raw signature bytes.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// A signed transfer of value between two identities.
///
/// Field declaration order is the persisted and wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender identity (public key), or `REWARD` for mining rewards.
    pub sender: Identity,
    /// Recipient identity.
    pub recipient: Identity,
    /// Amount transferred.
    pub amount: f64,
    /// Sender's signature over the signing payload (empty for rewards).
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// Borrowed canonical form: fixed field order `sender, recipient, amount, signature`.
#[derive(Serialize)]
pub struct CanonicalTransaction<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: f64,
    signature: String,
}

impl Transaction {
    /// Create a transaction from its parts.
    pub fn new(
        sender: impl Into<Identity>,
        recipient: impl Into<Identity>,
        amount: f64,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature,
        }
    }

    /// Create a mining-reward transaction crediting `recipient`.
    pub fn reward(recipient: Identity, amount: f64) -> Self {
        Self::new(Identity::reward(), recipient, amount, Vec::new())
    }

    /// Check if this is a mining-reward transaction.
    pub fn is_reward(&self) -> bool {
        self.sender.is_reward()
    }

    /// Amounts must be finite and non-negative.
    pub fn has_valid_amount(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }

    /// The string a wallet signs: `sender + recipient + amount`.
    pub fn signing_payload(&self) -> String {
        signing_payload(&self.sender, &self.recipient, self.amount)
    }

    /// SHA-256 of the signing payload.
    pub fn signing_hash(&self) -> Hash {
        hash(self.signing_payload().as_bytes())
    }

    /// Borrow this transaction in its canonical field order.
    pub fn canonical(&self) -> CanonicalTransaction<'_> {
        CanonicalTransaction {
            sender: self.sender.as_str(),
            recipient: self.recipient.as_str(),
            amount: self.amount,
            signature: hex::encode(&self.signature),
        }
    }
}

/// Build the signing payload for a transfer that has not been created yet.
pub fn signing_payload(sender: &Identity, recipient: &Identity, amount: f64) -> String {
    format!("{}{}{}", sender, recipient, amount)
}

/// Canonical string rendering of an ordered transaction list.
///
/// This is the transaction part of the proof-of-work input.
pub fn canonical_json(transactions: &[Transaction]) -> String {
    let canonical: Vec<CanonicalTransaction<'_>> =
        transactions.iter().map(Transaction::canonical).collect();
    serde_json::to_string(&canonical).expect("serialization should not fail")
}
