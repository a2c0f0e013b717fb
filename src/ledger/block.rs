//! Block structure for the ledger
//!
//! A block's identity is the hash of its canonical JSON encoding, nonce
//! included, so the nonce is the only field mining ever touches.

use serde::{Deserialize, Serialize};

use super::{now_millis, LedgerError, Transaction};
use crate::crypto::{hash_bytes, hex_serde, Hash};

/// Byte every leading digest position must equal for a block to count as mined
pub const POW_PREFIX_BYTE: u8 = b'0';

/// Index of the genesis block
pub const GENESIS_IDX: i64 = 1;

/// A block of committed transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// 1 for genesis, parent idx + 1 afterwards
    pub idx: i64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub txs: Vec<Transaction>,
    /// Hash of the parent block, empty for genesis
    #[serde(with = "hex_serde")]
    pub prev_hash: Vec<u8>,
    /// Nonce used for PoW
    pub nonce: i64,
}

impl Block {
    /// Create a new unmined block
    pub fn new(idx: i64, txs: Vec<Transaction>, prev_hash: Hash) -> Self {
        Self {
            idx,
            timestamp: now_millis(),
            txs,
            prev_hash: prev_hash.to_vec(),
            nonce: 0,
        }
    }

    /// The first block of every chain; never mined
    pub fn genesis() -> Self {
        Self {
            idx: GENESIS_IDX,
            timestamp: now_millis(),
            txs: Vec::new(),
            prev_hash: Vec::new(),
            nonce: 0,
        }
    }

    /// Calculate the hash of this block
    pub fn hash(&self) -> Result<Hash, LedgerError> {
        let encoded = serde_json::to_vec(self)?;
        Ok(hash_bytes(&encoded))
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.idx == GENESIS_IDX && self.prev_hash.is_empty()
    }

    /// Whether the current hash satisfies `difficulty`
    pub fn is_valid(&self, difficulty: usize) -> bool {
        match self.hash() {
            Ok(hash) => satisfies_difficulty(&hash, difficulty),
            Err(_) => false,
        }
    }

    pub fn has_tx(&self, id: &str) -> bool {
        self.txs.iter().any(|tx| tx.id == id)
    }
}

/// The first `difficulty` digest bytes must each be ASCII `'0'` (0x30).
///
/// This compares raw digest bytes, not hex characters or leading zero bits.
pub fn satisfies_difficulty(hash: &Hash, difficulty: usize) -> bool {
    difficulty <= hash.0.len() && hash.0[..difficulty].iter().all(|b| *b == POW_PREFIX_BYTE)
}
