// Longest-valid-chain consensus
//
// A neighbour's chain replaces ours only if it is strictly longer than every
// chain seen so far (starting from our own length) and validates. The pool is
// never reconciled against the adopted chain.

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};

use crate::blockchain::{validate_chain, Block, Blockchain};
use crate::network::PeerNetwork;

/// Picks the longest valid chain strictly longer than `local_length`.
///
/// Candidates are considered in order; on equal lengths the first one wins.
pub fn select_longest_chain(
    local_length: usize,
    candidates: Vec<(String, Vec<Block>)>,
    difficulty: usize,
) -> Option<Vec<Block>> {
    let mut max_length = local_length;
    let mut longest = None;

    for (neighbour, chain) in candidates {
        if chain.len() <= max_length {
            debug!("Chain from {} is not longer ({} <= {})", neighbour, chain.len(), max_length);
            continue;
        }

        match validate_chain(&chain, difficulty) {
            Ok(()) => {
                max_length = chain.len();
                longest = Some(chain);
            }
            Err(err) => warn!("Discarding chain from {}: {}", neighbour, err),
        }
    }

    longest
}

/// Fetches neighbours' chains and adopts the longest valid one
#[derive(Clone)]
pub struct ConsensusResolver {
    blockchain: Arc<Blockchain>,
    network: Arc<dyn PeerNetwork>,
}

impl ConsensusResolver {
    pub fn new(blockchain: Arc<Blockchain>, network: Arc<dyn PeerNetwork>) -> Self {
        ConsensusResolver { blockchain, network }
    }

    /// Returns true if the local chain was replaced.
    ///
    /// Neighbours are fetched concurrently without holding the ledger lock. A
    /// neighbour that fails or answers garbage is skipped.
    pub async fn resolve_conflicts(&self) -> bool {
        let neighbours = self.blockchain.neighbours();
        let fetches = neighbours.iter().map(|neighbour| async move {
            (neighbour, self.network.fetch_chain(neighbour).await)
        });

        let candidates: Vec<(String, Vec<Block>)> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(neighbour, result)| match result {
                Ok(chain) => Some((neighbour.clone(), chain)),
                Err(err) => {
                    warn!("Skipping neighbour during consensus: {}", err);
                    None
                }
            })
            .collect();

        let difficulty = self.blockchain.settings().difficulty;
        let replaced = self
            .blockchain
            .replace_chain_with(|local| select_longest_chain(local.len(), candidates, difficulty));

        if replaced {
            info!("Resolve conflicts replaced, chain length {}", self.blockchain.chain_len());
        } else {
            info!("Resolve conflicts not replaced");
        }

        replaced
    }
}
