//! Peer transport.
//!
//! Peers are addressed by `host:port` strings and speak three routes:
//!
//! | route                        | body                        | reply            |
//! |------------------------------|-----------------------------|------------------|
//! | `POST /broadcast-transaction`| transaction JSON            | status only      |
//! | `POST /broadcast-block`      | `{"block": <block JSON>}`   | status only      |
//! | `GET /chain`                 | none                        | blocks JSON array|

use powchain_core::{Block, Transaction};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors talking to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("peer {peer} is unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} sent an unreadable response: {reason}")]
    Decode { peer: String, reason: String },
}

/// Status a peer returns when it rejects a block that conflicts with its chain.
pub const STATUS_CONFLICT: u16 = 409;

/// True for statuses that mean the peer refused the payload.
pub fn is_rejection(status: u16) -> bool {
    status == 400 || status == 500
}

/// Outbound calls a node makes to its peers.
pub trait PeerTransport: Send + Sync + 'static {
    /// Send a pending transaction; returns the peer's status code.
    fn broadcast_transaction(
        &self,
        peer: &str,
        tx: &Transaction,
    ) -> impl Future<Output = Result<u16, NetworkError>> + Send;

    /// Send a freshly mined block; returns the peer's status code.
    fn broadcast_block(
        &self,
        peer: &str,
        block: &Block,
    ) -> impl Future<Output = Result<u16, NetworkError>> + Send;

    /// Fetch the peer's full chain.
    fn fetch_chain(&self, peer: &str)
        -> impl Future<Output = Result<Vec<Block>, NetworkError>> + Send;
}

#[derive(Serialize)]
struct BlockEnvelope<'a> {
    block: &'a Block,
}

/// [`PeerTransport`] over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `http://{peer}/{route}`
    pub fn url(peer: &str, route: &str) -> String {
        format!("http://{}/{}", peer.trim_end_matches('/'), route)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        peer: &str,
        route: &str,
        body: &B,
    ) -> Result<u16, NetworkError> {
        let response = self
            .client
            .post(Self::url(peer, route))
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        Ok(response.status().as_u16())
    }
}

fn unreachable(peer: &str, e: reqwest::Error) -> NetworkError {
    NetworkError::Unreachable {
        peer: peer.to_string(),
        reason: e.to_string(),
    }
}

impl PeerTransport for HttpTransport {
    async fn broadcast_transaction(&self, peer: &str, tx: &Transaction) -> Result<u16, NetworkError> {
        self.post(peer, "broadcast-transaction", tx).await
    }

    async fn broadcast_block(&self, peer: &str, block: &Block) -> Result<u16, NetworkError> {
        self.post(peer, "broadcast-block", &BlockEnvelope { block }).await
    }

    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, NetworkError> {
        let response = self
            .client
            .get(Self::url(peer, "chain"))
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;

        response.json().await.map_err(|e| NetworkError::Decode {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::Identity;

    #[test]
    fn test_url() {
        assert_eq!(
            HttpTransport::url("localhost:5001", "chain"),
            "http://localhost:5001/chain"
        );
        assert_eq!(
            HttpTransport::url("10.0.0.2:80/", "broadcast-block"),
            "http://10.0.0.2:80/broadcast-block"
        );
    }

    #[test]
    fn test_block_envelope_shape() {
        let block = Block::genesis();
        let json = serde_json::to_value(BlockEnvelope { block: &block }).unwrap();
        assert_eq!(json["block"]["index"], 0);
        assert_eq!(json["block"]["proof_number"], 100);
    }

    #[test]
    fn test_transaction_body_shape() {
        let tx = Transaction::new(Identity::new("a"), Identity::new("b"), 2.0, vec![0xff]);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["sender"], "a");
        assert_eq!(json["recipient"], "b");
        assert_eq!(json["amount"], 2.0);
        assert_eq!(json["signature"], "ff");
    }

    #[test]
    fn test_rejection_statuses() {
        assert!(is_rejection(400));
        assert!(is_rejection(500));
        assert!(!is_rejection(201));
        assert!(!is_rejection(STATUS_CONFLICT));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let result = transport.fetch_chain("127.0.0.1:1").await;
        assert!(matches!(result, Err(NetworkError::Unreachable { .. })));
    }
}
