use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::crypto::{public_key_from_hex, DigitalSignature, Wallet};
use crate::blockchain::{Address, Block, Submission, Transaction, TransactionError, MINING_SENDER};

/// A signed transfer as submitted by wallets and relayed between peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender_blockchain_address: String,

    /// The recipient's address
    pub recipient_blockchain_address: String,

    /// The sender's ed25519 public key, hex encoded
    pub sender_public_key: String,

    /// The amount to transfer
    pub value: f64,

    /// Signature over the transaction digest, base58 encoded
    pub signature: String,
}

impl TransactionRequest {
    /// Builds and signs a request with `wallet` as the sender
    pub fn signed(wallet: &Wallet, recipient: &Address, value: f64) -> Self {
        let transaction = Transaction::new(wallet.address().clone(), recipient.clone(), value);

        TransactionRequest {
            sender_blockchain_address: wallet.address().0.clone(),
            recipient_blockchain_address: recipient.0.clone(),
            sender_public_key: wallet.public_key_hex(),
            value,
            signature: transaction.sign(wallet).0,
        }
    }
}

impl TryFrom<TransactionRequest> for Submission {
    type Error = TransactionError;

    /// Requests always become transfers; the reward sender is refused so the
    /// unchecked reward path cannot be reached from the network.
    fn try_from(request: TransactionRequest) -> Result<Self, Self::Error> {
        if request.sender_blockchain_address == MINING_SENDER {
            return Err(TransactionError::ReservedSender(request.sender_blockchain_address));
        }

        let public_key = public_key_from_hex(&request.sender_public_key)?;

        Ok(Submission::Transfer {
            transaction: Transaction::new(
                Address(request.sender_blockchain_address),
                Address(request.recipient_blockchain_address),
                request.value,
            ),
            public_key,
            signature: DigitalSignature(request.signature),
        })
    }
}

/// Response for the chain endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain, genesis first
    pub chain: Vec<Block>,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        ChainResponse {
            length: chain.len(),
            chain,
        }
    }
}
