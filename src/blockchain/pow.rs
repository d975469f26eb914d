// Proof of work
//
// The predicate is textual: the first `difficulty` characters of the hex
// digest must all be '0' (4 bits per character). Trial blocks are hashed with
// timestamp 0 so anyone can re-run the check from (nonce, previousHash,
// transactions) alone.

use super::block::{BlockHash, CanonicalBlock};
use super::transaction::Transaction;

/// Default number of leading hex zeros required
pub const MINING_DIFFICULTY: usize = 3;

/// Hex length of a block hash; no nonce satisfies a higher difficulty
pub const MAX_DIFFICULTY: usize = 64;

fn meets_difficulty(hash: &BlockHash, difficulty: usize) -> bool {
    let encoded = hash.to_hex();
    difficulty <= MAX_DIFFICULTY && encoded.bytes().take(difficulty).all(|c| c == b'0')
}

/// Checks whether `nonce` solves the puzzle for this block content
pub fn valid_proof(
    nonce: u64,
    previous_hash: &BlockHash,
    transactions: &[Transaction],
    difficulty: usize,
) -> bool {
    let trial = CanonicalBlock {
        nonce,
        previous_hash,
        timestamp: 0,
        transactions,
    };
    meets_difficulty(&trial.hash(), difficulty)
}

/// Searches nonces upward from 0 until `valid_proof` holds.
///
/// Unbounded and blocking: with an unreachable difficulty this never returns.
pub fn find_nonce(previous_hash: &BlockHash, transactions: &[Transaction], difficulty: usize) -> u64 {
    let mut trial = CanonicalBlock {
        nonce: 0,
        previous_hash,
        timestamp: 0,
        transactions,
    };

    while !meets_difficulty(&trial.hash(), difficulty) {
        trial.nonce += 1;
    }
    trial.nonce
}
