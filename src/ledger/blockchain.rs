//! Chain state management
//!
//! Holds the committed blocks and the pool of admitted, not yet committed
//! transactions. Every method here is a pure in-memory mutation; callers
//! persist the result through the storage layer's locked cycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{now_millis, Block, LedgerError, Transaction};

/// Complete chain state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blockchain {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub tx_pool: Vec<Transaction>,
}

impl Blockchain {
    /// A chain holding only a fresh genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            tx_pool: Vec::new(),
        }
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn has_pending_txs(&self) -> bool {
        !self.tx_pool.is_empty()
    }

    /// Net balance of `address` across pooled and committed transactions
    pub fn balance(&self, address: &str) -> f64 {
        let pooled: f64 = self
            .tx_pool
            .iter()
            .map(|tx| tx.body.balance_delta(address))
            .sum();

        let committed: f64 = self
            .blocks
            .iter()
            .flat_map(|block| block.txs.iter())
            .map(|tx| tx.body.balance_delta(address))
            .sum();

        pooled + committed
    }

    /// Whether a transaction id is pooled or committed
    pub fn contains_tx(&self, id: &str) -> bool {
        self.tx_pool.iter().any(|tx| tx.id == id) || self.blocks.iter().any(|b| b.has_tx(id))
    }

    /// Validate and admit a transaction into the pool.
    ///
    /// Assigns `id` and `timestamp` when absent and returns the stored copy.
    pub fn add_tx(&mut self, mut tx: Transaction) -> Result<Transaction, LedgerError> {
        if !tx.id.is_empty() && self.contains_tx(&tx.id) {
            return Err(LedgerError::DuplicateTransaction(tx.id));
        }

        self.validate_transaction(&tx)?;

        if tx.id.is_empty() {
            tx.id = Uuid::new_v4().to_string();
        }
        if tx.timestamp == 0 {
            tx.timestamp = now_millis();
        }

        self.tx_pool.push(tx.clone());
        Ok(tx)
    }

    fn validate_transaction(&self, tx: &Transaction) -> Result<(), LedgerError> {
        if tx.is_coinbase() {
            return Ok(());
        }

        // NaN fails this comparison as well
        if !(tx.body.amount > 0.0) {
            return Err(LedgerError::InvalidAmount);
        }

        tx.verify_sender()?;

        let balance = self.balance(&tx.body.sender);
        if tx.body.amount > balance {
            return Err(LedgerError::InsufficientFunds {
                balance,
                amount: tx.body.amount,
            });
        }

        Ok(())
    }

    /// Build an unmined candidate from the oldest `max_txs` pool entries.
    ///
    /// Does not touch the pool.
    pub fn new_block(&self, max_txs: usize) -> Result<Block, LedgerError> {
        if self.tx_pool.is_empty() {
            return Err(LedgerError::NoPendingTransactions);
        }

        let last = self.last_block().ok_or(LedgerError::MissingGenesis)?;
        let count = max_txs.min(self.tx_pool.len());
        let txs = self.tx_pool[..count].to_vec();

        Ok(Block::new(last.idx + 1, txs, last.hash()?))
    }

    /// Append a block on top of the current tip and drop its transactions from the pool
    pub fn add_block(&mut self, block: Block) -> Result<(), LedgerError> {
        let last = self.last_block().ok_or(LedgerError::MissingGenesis)?;

        if block.prev_hash != last.hash()?.to_vec() {
            return Err(LedgerError::PrevHashMismatch);
        }
        if block.idx != last.idx + 1 {
            return Err(LedgerError::IndexMismatch {
                last: last.idx,
                got: block.idx,
            });
        }

        self.remove_txs(&block.txs);
        self.blocks.push(block);
        Ok(())
    }

    /// Proof-of-work check followed by `add_block`; used for blocks received from peers
    pub fn accept_block(&mut self, block: Block, difficulty: usize) -> Result<(), LedgerError> {
        if !block.is_valid(difficulty) {
            return Err(LedgerError::InsufficientWork { difficulty });
        }

        self.add_block(block)
    }

    /// Remove every pool entry whose id matches one of `txs`
    pub fn remove_txs(&mut self, txs: &[Transaction]) {
        self.tx_pool
            .retain(|pooled| !txs.iter().any(|tx| tx.id == pooled.id));
    }

    /// Replace the block list wholesale with `other`'s and drop pool entries it already commits
    pub fn update(&mut self, other: Blockchain) {
        self.blocks = other.blocks;

        let blocks = &self.blocks;
        self.tx_pool
            .retain(|pooled| !blocks.iter().skip(1).any(|b| b.has_tx(&pooled.id)));
    }

    /// Genesis shape, hash chaining, and proof of work over the whole chain
    pub fn is_valid_chain(&self, difficulty: usize) -> bool {
        let genesis = match self.blocks.first() {
            Some(block) => block,
            None => return false,
        };
        if !genesis.is_genesis() {
            return false;
        }

        self.blocks.windows(2).all(|pair| {
            let (parent, child) = (&pair[0], &pair[1]);
            let chained = match parent.hash() {
                Ok(hash) => child.prev_hash == hash.to_vec(),
                Err(_) => false,
            };
            chained && child.idx == parent.idx + 1 && child.is_valid(difficulty)
        })
    }
}

/// Pick the candidate with the most blocks.
///
/// Only a strictly longer chain displaces the current best, so on ties the
/// earliest candidate wins. Returns `None` for an empty candidate list.
pub fn longest_chain<I>(candidates: I) -> Option<Blockchain>
where
    I: IntoIterator<Item = Blockchain>,
{
    let mut best: Option<Blockchain> = None;

    for candidate in candidates {
        let longer = match &best {
            Some(current) => candidate.len() > current.len(),
            None => true,
        };
        if longer {
            best = Some(candidate);
        }
    }

    best
}
