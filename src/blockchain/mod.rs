// Blockchain module
//
// The ledger engine:
// - Transaction and admission
// - Block structure and hashing
// - Proof of work
// - The ledger aggregate (pool, chain, balances, validation)

pub mod block;
pub mod chain;
pub mod crypto;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockHash};
pub use chain::{validate_chain, Blockchain, BlockchainError, MiningSettings};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use transaction::{Submission, Transaction, TransactionError, MINING_SENDER};
