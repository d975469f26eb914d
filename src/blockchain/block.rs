use chrono::Utc;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use std::fmt;

use super::transaction::Transaction;

/// A SHA-256 block digest.
///
/// On the wire and inside the canonical encoding this is always the
/// 64-character lowercase hex form, never raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(encoded: &str) -> Result<Self, String> {
        if encoded.len() != 64 {
            return Err(format!("expected 64 hex characters, got {}", encoded.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(encoded, &mut bytes).map_err(|e| e.to_string())?;
        Ok(BlockHash(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BlockHash::from_hex(&encoded).map_err(de::Error::custom)
    }
}

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Proof of work
    pub nonce: u64,

    /// Hash of the previous block
    #[serde(rename = "previousHash")]
    #[schema(value_type = String, example = "000a1f...")]
    pub previous_hash: BlockHash,

    /// Creation time, nanoseconds since the Unix epoch
    pub timestamp: i64,

    /// Transactions in pool order
    pub transactions: Vec<Transaction>,
}

/// Borrowed view of a block in canonical field order.
///
/// Both `Block::hash` and the proof-of-work trial hash go through this type,
/// so mining and verification always hash identical bytes.
#[derive(Serialize)]
pub(crate) struct CanonicalBlock<'a> {
    pub nonce: u64,
    #[serde(rename = "previousHash")]
    pub previous_hash: &'a BlockHash,
    pub timestamp: i64,
    pub transactions: &'a [Transaction],
}

impl CanonicalBlock<'_> {
    pub fn hash(&self) -> BlockHash {
        let encoded = serde_json::to_vec(self).expect("block fields are plain strings and numbers");
        BlockHash(Sha256::digest(encoded).into())
    }
}

impl Block {
    /// Creates a new block stamped with the current time
    pub fn new(nonce: u64, previous_hash: BlockHash, transactions: Vec<Transaction>) -> Self {
        Block {
            nonce,
            previous_hash,
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            transactions,
        }
    }

    /// Creates the first block of a chain: nonce 0, no transactions, linked to
    /// the hash of the all-zero block
    pub fn genesis() -> Self {
        Self::new(0, Self::empty().hash(), Vec::new())
    }

    fn empty() -> Self {
        Block {
            nonce: 0,
            previous_hash: BlockHash::default(),
            timestamp: 0,
            transactions: Vec::new(),
        }
    }

    pub(crate) fn canonical(&self) -> CanonicalBlock<'_> {
        CanonicalBlock {
            nonce: self.nonce,
            previous_hash: &self.previous_hash,
            timestamp: self.timestamp,
            transactions: &self.transactions,
        }
    }

    /// SHA-256 of the canonical encoding, timestamp included
    pub fn hash(&self) -> BlockHash {
        self.canonical().hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    fn sample_block() -> Block {
        let transactions = vec![
            Transaction::reward(Address("recipient1".to_string()), 10.0),
            Transaction::new("A".into(), "B".into(), 2.5),
        ];
        Block::new(100, BlockHash([7u8; 32]), transactions)
    }

    #[test]
    fn test_new_block() {
        let block = sample_block();

        assert_eq!(block.nonce, 100);
        assert_eq!(block.previous_hash, BlockHash([7u8; 32]));
        assert_eq!(block.transactions.len(), 2);
        assert!(block.timestamp > 0);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.hash(), block.clone().hash());
        assert_eq!(block.hash().to_hex().len(), 64);

        let mut other = block.clone();
        other.timestamp += 1;
        assert_ne!(block.hash(), other.hash());
    }

    #[test]
    fn test_canonical_encoding() {
        let block = Block {
            nonce: 4,
            previous_hash: BlockHash([0xab; 32]),
            timestamp: 0,
            transactions: vec![Transaction::new("A".into(), "B".into(), 1.5)],
        };

        let encoded = serde_json::to_string(&block).unwrap();
        let expected = format!(
            r#"{{"nonce":4,"previousHash":"{}","timestamp":0,"transactions":[{{"senderBlockchainAddress":"A","recipientBlockchainAddress":"B","value":1.5}}]}}"#,
            "ab".repeat(32)
        );
        assert_eq!(encoded, expected);
        assert_eq!(
            block.hash(),
            BlockHash(Sha256::digest(expected.as_bytes()).into())
        );
    }

    #[test]
    fn test_wire_form_preserves_hash() {
        let block = sample_block();
        let decoded: Block = serde_json::from_str(&serde_json::to_string(&block).unwrap()).unwrap();
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn test_rejects_malformed_previous_hash() {
        let short = r#"{"nonce":0,"previousHash":"abcd","timestamp":0,"transactions":[]}"#;
        assert!(serde_json::from_str::<Block>(short).is_err());

        let not_hex = format!(
            r#"{{"nonce":0,"previousHash":"{}","timestamp":0,"transactions":[]}}"#,
            "zz".repeat(32)
        );
        assert!(serde_json::from_str::<Block>(&not_hex).is_err());
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();

        assert_eq!(genesis.nonce, 0);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.previous_hash, Block::empty().hash());
        assert_eq!(Block::genesis().previous_hash, genesis.previous_hash);
    }
}
