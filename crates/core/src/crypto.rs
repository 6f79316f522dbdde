//! Signing and verification capabilities, with an Ed25519 default.
//!
//! The ledger only consumes [`WalletSigner`] and [`SignatureVerifier`]; key
//! generation and storage live outside the core.

use crate::hash::Hash;
use crate::transaction::{signing_payload, Identity, Transaction};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Produces signatures for the local wallet.
pub trait WalletSigner {
    /// The identity transactions from this wallet are sent as.
    fn identity(&self) -> Identity;

    /// Sign a transfer of `amount` from this wallet to `recipient`.
    fn sign(&self, recipient: &Identity, amount: f64) -> Vec<u8>;

    /// Build a signed transaction from this wallet.
    fn signed_transaction(&self, recipient: Identity, amount: f64) -> Transaction {
        let signature = self.sign(&recipient, amount);
        Transaction::new(self.identity(), recipient, amount, signature)
    }
}

/// Verifies a transaction's signature using its sender as the public key.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, tx: &Transaction) -> bool;
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Parse a signature from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Decode a public key from a hex identity.
    pub fn from_identity(identity: &Identity) -> Result<Self, CryptoError> {
        let bytes = hex::decode(identity.as_str()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&arr).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key))
    }

    /// The identity this key signs as.
    pub fn to_identity(&self) -> Identity {
        Identity::new(hex::encode(self.0.as_bytes()))
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

/// A keypair for signing and verification.
pub struct Keypair {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Create a keypair from a private key (32 bytes).
    pub fn from_private_key(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Get the private key bytes.
    pub fn private_key(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a hash directly.
    pub fn sign_hash(&self, hash: &Hash) -> Signature {
        Signature(self.signing_key.sign(hash.as_bytes()).to_bytes())
    }
}

impl WalletSigner for Keypair {
    fn identity(&self) -> Identity {
        self.public_key.to_identity()
    }

    fn sign(&self, recipient: &Identity, amount: f64) -> Vec<u8> {
        let payload = signing_payload(&self.identity(), recipient, amount);
        let digest = crate::hash::hash(payload.as_bytes());
        self.sign_hash(&digest).0.to_vec()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("identity", &self.identity())
            .finish()
    }
}

/// Ed25519 verification keyed by the transaction's sender.
///
/// Reward transactions are exempt and always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, tx: &Transaction) -> bool {
        if tx.is_reward() {
            return true;
        }
        let Ok(public_key) = PublicKey::from_identity(&tx.sender) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&tx.signature) else {
            return false;
        };
        public_key
            .verify(tx.signing_hash().as_bytes(), &signature)
            .is_ok()
    }
}
