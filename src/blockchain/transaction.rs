use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{verify_signature, Address, CryptoError, DigitalSignature, Wallet};

/// Sender identity of mining-reward transactions
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Errors that can occur during transaction admission
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Public key does not own sender address {0}")]
    SenderKeyMismatch(Address),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Sender {0} is reserved for mining rewards")]
    ReservedSender(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// A transfer of value between two addresses.
///
/// Field order here is the canonical serialization used for both the signing
/// digest and block hashing. Do not reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[serde(rename = "senderBlockchainAddress")]
    #[schema(value_type = String)]
    pub sender: Address,

    #[serde(rename = "recipientBlockchainAddress")]
    #[schema(value_type = String)]
    pub recipient: Address,

    pub value: f64,
}

impl Transaction {
    pub fn new(sender: Address, recipient: Address, value: f64) -> Self {
        Transaction {
            sender,
            recipient,
            value,
        }
    }

    /// Creates a mining-reward transaction crediting `recipient`
    pub fn reward(recipient: Address, value: f64) -> Self {
        Self::new(Address(MINING_SENDER.to_string()), recipient, value)
    }

    pub fn is_reward(&self) -> bool {
        self.sender.0 == MINING_SENDER
    }

    /// Canonical JSON encoding: `{"senderBlockchainAddress":..,"recipientBlockchainAddress":..,"value":..}`
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("transaction fields are plain strings and numbers")
    }

    /// SHA-256 of the canonical encoding; this is what senders sign
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.canonical_bytes()).into()
    }

    /// Signs the transaction digest with `wallet`
    pub fn sign(&self, wallet: &Wallet) -> DigitalSignature {
        wallet.sign(&self.digest())
    }

    /// Checks that `signature` was produced by `public_key` over this exact transaction
    pub fn verify(&self, public_key: &VerifyingKey, signature: &DigitalSignature) -> bool {
        verify_signature(public_key, &self.digest(), signature).unwrap_or(false)
    }
}

/// A transaction as presented for admission to the pool.
///
/// Reward transactions carry no credentials and skip every check; they are
/// only ever built by the node itself. Transfers must carry the sender's
/// public key and a signature over the transaction digest.
#[derive(Debug, Clone)]
pub enum Submission {
    Reward {
        recipient: Address,
        value: f64,
    },
    Transfer {
        transaction: Transaction,
        public_key: VerifyingKey,
        signature: DigitalSignature,
    },
}

impl Submission {
    /// Builds a signed transfer from a wallet, for local callers and tests
    pub fn signed(wallet: &Wallet, recipient: Address, value: f64) -> Self {
        let transaction = Transaction::new(wallet.address().clone(), recipient, value);
        let signature = transaction.sign(wallet);

        Submission::Transfer {
            transaction,
            public_key: *wallet.public_key(),
            signature,
        }
    }

    /// The transaction that lands in the pool if admitted
    pub fn transaction(&self) -> Transaction {
        match self {
            Submission::Reward { recipient, value } => Transaction::reward(recipient.clone(), *value),
            Submission::Transfer { transaction, .. } => transaction.clone(),
        }
    }
}
