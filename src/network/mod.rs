// Network module
//
// Everything the ledger needs from its peers goes through `PeerNetwork`:
// fetching a neighbour's chain and delivering notifications. The HTTP
// implementation lives in `http`, neighbour scanning in `discovery`.

pub mod discovery;
pub mod http;
pub mod messages;

use async_trait::async_trait;
use futures::future::join_all;
use log::warn;
use thiserror::Error;

use crate::blockchain::Block;

pub use http::HttpPeerNetwork;
pub use messages::{ChainResponse, TransactionRequest};

/// Errors from a single neighbour interaction.
///
/// These never abort the surrounding operation; the neighbour is skipped.
#[derive(Debug, Clone, Error)]
pub enum PeerError {
    #[error("Neighbour {neighbour} unreachable: {reason}")]
    Unreachable { neighbour: String, reason: String },

    #[error("Neighbour {neighbour} answered with status {status}")]
    UnexpectedStatus { neighbour: String, status: u16 },

    #[error("Malformed response from {neighbour}: {reason}")]
    MalformedResponse { neighbour: String, reason: String },
}

/// Events a node pushes to its neighbours
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A transaction was admitted here; neighbours should admit it too
    Transaction(TransactionRequest),

    /// A block was created from the pool; neighbours should clear theirs
    BlockCreated,

    /// A block was mined; neighbours should run consensus
    ConsensusRequested,
}

#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Fetches the full chain of `neighbour`
    async fn fetch_chain(&self, neighbour: &str) -> Result<Vec<Block>, PeerError>;

    /// Delivers `event` to `neighbour`
    async fn notify(&self, neighbour: &str, event: &PeerEvent) -> Result<(), PeerError>;
}

/// Sends `event` to every neighbour concurrently.
///
/// Failures are logged and not retried. Returns how many deliveries succeeded.
pub async fn broadcast(network: &dyn PeerNetwork, neighbours: &[String], event: &PeerEvent) -> usize {
    let deliveries = neighbours
        .iter()
        .map(|neighbour| network.notify(neighbour, event));

    join_all(deliveries)
        .await
        .into_iter()
        .filter(|result| match result {
            Ok(()) => true,
            Err(err) => {
                warn!("Failed to notify neighbour: {}", err);
                false
            }
        })
        .count()
}
