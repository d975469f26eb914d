use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use thiserror::Error;
use log::{info, warn};

use super::block::{Block, BlockHash};
use super::crypto::Address;
use super::pow::{self, MINING_DIFFICULTY};
use super::transaction::{Submission, Transaction, TransactionError};

/// Reward credited to the miner for each block
pub const MINING_REWARD: f64 = 1.0;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Chain must contain a genesis block")]
    EmptyChain,

    #[error("System error: {0}")]
    SystemError(String),
}

/// Proof-of-work parameters of a ledger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningSettings {
    /// Leading hex zeros required in a block hash
    pub difficulty: usize,

    /// Amount credited to the node's address per mined block
    pub reward: f64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        MiningSettings {
            difficulty: MINING_DIFFICULTY,
            reward: MINING_REWARD,
        }
    }
}

/// Checks linkage and proof of work for every consecutive pair of blocks.
///
/// Chains of zero or one block are valid. The genesis block itself is not
/// checked against the puzzle.
pub fn validate_chain(chain: &[Block], difficulty: usize) -> Result<(), BlockchainError> {
    for (index, pair) in chain.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.previous_hash != previous.hash() {
            return Err(BlockchainError::InvalidChain(format!(
                "block {} does not link to block {}",
                index + 1,
                index
            )));
        }

        if !pow::valid_proof(current.nonce, &current.previous_hash, &current.transactions, difficulty) {
            return Err(BlockchainError::InvalidChain(format!(
                "block {} has an invalid proof of work (nonce {})",
                index + 1,
                current.nonce
            )));
        }
    }

    Ok(())
}

/// Net amount held by `address` across every committed transaction
pub fn calculate_total_amount(chain: &[Block], address: &Address) -> f64 {
    let mut total = 0.0;

    for transaction in chain.iter().flat_map(|block| block.transactions.iter()) {
        if transaction.recipient == *address {
            total += transaction.value;
        }
        if transaction.sender == *address {
            total -= transaction.value;
        }
    }

    total
}

/// Chain and pool, always locked together
#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    transaction_pool: Vec<Transaction>,
}

impl LedgerState {
    fn last_block(&self) -> &Block {
        self.chain.last().expect("ledger chain always holds a genesis block")
    }

    fn append_block(&mut self, nonce: u64, previous_hash: BlockHash, transactions: Vec<Transaction>) -> Block {
        let block = Block::new(nonce, previous_hash, transactions);
        self.chain.push(block.clone());
        self.transaction_pool.clear();
        block
    }
}

/// The node's ledger: one chain, one transaction pool, the node's own
/// address and its known neighbours.
#[derive(Debug)]
pub struct Blockchain {
    /// Chain and pending transactions
    state: Mutex<LedgerState>,

    /// Peer addresses (`host:port`), replaced wholesale on refresh
    neighbours: RwLock<Vec<String>>,

    /// Where mining rewards accrue
    address: Address,

    settings: MiningSettings,
}

impl Blockchain {
    /// Creates a ledger holding only a fresh genesis block
    pub fn new(address: Address, settings: MiningSettings) -> Self {
        Blockchain {
            state: Mutex::new(LedgerState {
                chain: vec![Block::genesis()],
                transaction_pool: Vec::new(),
            }),
            neighbours: RwLock::new(Vec::new()),
            address,
            settings,
        }
    }

    /// Creates a ledger starting from an existing chain
    ///
    /// # Errors
    ///
    /// `EmptyChain` without a genesis block, `InvalidChain` if the chain
    /// fails validation at this ledger's difficulty.
    pub fn with_chain(address: Address, settings: MiningSettings, chain: Vec<Block>) -> Result<Self, BlockchainError> {
        if chain.is_empty() {
            return Err(BlockchainError::EmptyChain);
        }
        validate_chain(&chain, settings.difficulty)?;

        let blockchain = Self::new(address, settings);
        blockchain.state().chain = chain;
        Ok(blockchain)
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn settings(&self) -> MiningSettings {
        self.settings
    }

    pub fn chain(&self) -> Vec<Block> {
        self.state().chain.clone()
    }

    pub fn chain_len(&self) -> usize {
        self.state().chain.len()
    }

    pub fn last_block(&self) -> Block {
        self.state().last_block().clone()
    }

    pub fn transaction_pool(&self) -> Vec<Transaction> {
        self.state().transaction_pool.clone()
    }

    pub fn clear_transaction_pool(&self) {
        self.state().transaction_pool.clear();
    }

    pub fn neighbours(&self) -> Vec<String> {
        self.neighbours
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_neighbours(&self, neighbours: Vec<String>) {
        *self.neighbours.write().unwrap_or_else(PoisonError::into_inner) = neighbours;
    }

    /// Admits a transaction to the pool.
    ///
    /// Rewards are appended unconditionally. Transfers are checked in order:
    /// signature over the transaction digest, ownership of the sender address
    /// by the signing key, a positive amount, then the sender's committed
    /// balance. A rejected transaction leaves the pool untouched.
    pub fn add_transaction(&self, submission: Submission) -> Result<(), BlockchainError> {
        let result = self.admit(submission);

        if let Err(err) = &result {
            warn!("Rejected transaction: {}", err);
        }

        result
    }

    fn admit(&self, submission: Submission) -> Result<(), BlockchainError> {
        let (transaction, public_key, signature) = match submission {
            Submission::Reward { recipient, value } => {
                self.state().transaction_pool.push(Transaction::reward(recipient, value));
                return Ok(());
            }
            Submission::Transfer {
                transaction,
                public_key,
                signature,
            } => (transaction, public_key, signature),
        };

        if !transaction.verify(&public_key, &signature) {
            return Err(TransactionError::InvalidSignature.into());
        }

        if Address::from_public_key(&public_key) != transaction.sender {
            return Err(TransactionError::SenderKeyMismatch(transaction.sender).into());
        }

        if !transaction.value.is_finite() || transaction.value <= 0.0 {
            return Err(TransactionError::InvalidAmount(format!(
                "Amount must be positive: {}",
                transaction.value
            ))
            .into());
        }

        let mut state = self.state();
        let available = calculate_total_amount(&state.chain, &transaction.sender);
        if available < transaction.value {
            return Err(TransactionError::InsufficientBalance {
                required: transaction.value,
                available,
            }
            .into());
        }

        state.transaction_pool.push(transaction);
        Ok(())
    }

    /// Seals the current pool into a block with the given proof and clears the pool
    pub fn create_block(&self, nonce: u64, previous_hash: BlockHash) -> Block {
        let mut state = self.state();
        let transactions = std::mem::take(&mut state.transaction_pool);
        state.append_block(nonce, previous_hash, transactions)
    }

    /// Finds a nonce for the current pool on top of the current last block
    pub fn proof_of_work(&self) -> u64 {
        let state = self.state();
        let previous_hash = state.last_block().hash();
        pow::find_nonce(&previous_hash, &state.transaction_pool, self.settings.difficulty)
    }

    /// Mines a block: credits the reward, searches a nonce over a snapshot of
    /// the pool, appends the block and clears the pool.
    ///
    /// The ledger lock is held for the whole search, so other ledger calls
    /// wait until mining finishes.
    pub fn mine(&self) -> Block {
        let mut state = self.state();

        state
            .transaction_pool
            .push(Transaction::reward(self.address.clone(), self.settings.reward));

        let transactions = state.transaction_pool.clone();
        let previous_hash = state.last_block().hash();
        let nonce = pow::find_nonce(&previous_hash, &transactions, self.settings.difficulty);
        let block = state.append_block(nonce, previous_hash, transactions);

        info!(
            "action=mining, status=success, height={}, nonce={}, transactions={}",
            state.chain.len() - 1,
            nonce,
            block.transactions.len()
        );

        block
    }

    /// Balance of `address` over committed blocks; pending transactions do not count
    pub fn balance_of(&self, address: &Address) -> f64 {
        calculate_total_amount(&self.state().chain, address)
    }

    /// Validates an arbitrary chain at this ledger's difficulty
    pub fn is_valid_chain(&self, chain: &[Block]) -> bool {
        validate_chain(chain, self.settings.difficulty).is_ok()
    }

    /// Validates the ledger's own chain
    pub fn is_valid(&self) -> bool {
        let chain = self.chain();
        self.is_valid_chain(&chain)
    }

    /// Replaces the chain with whatever `select` returns, atomically.
    ///
    /// `select` sees the current chain under the ledger lock, so a decision
    /// based on its length cannot race with mining. The pool is left as is.
    pub fn replace_chain_with<F>(&self, select: F) -> bool
    where
        F: FnOnce(&[Block]) -> Option<Vec<Block>>,
    {
        let mut state = self.state();

        match select(&state.chain) {
            Some(chain) if !chain.is_empty() => {
                state.chain = chain;
                true
            }
            _ => false,
        }
    }
}
