//! Block miner implementation
//!
//! Searches nonces until the block hash satisfies the configured difficulty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ledger::Block;

/// Mining result
#[derive(Debug)]
pub enum MiningResult {
    /// Successfully mined a block
    Success(Block),
    /// Mining was interrupted
    Interrupted,
}

/// Block miner
#[derive(Clone, Default)]
pub struct Miner {
    /// Stop signal
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop mining
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Mine a block (find valid nonce)
    ///
    /// Starts from the block's current nonce and increments it until the
    /// hash satisfies `difficulty` or the stop signal is raised. Blocking;
    /// run it on a blocking thread from async code.
    pub fn mine_block(&self, mut block: Block, difficulty: usize) -> MiningResult {
        loop {
            if self.is_stopped() {
                return MiningResult::Interrupted;
            }

            if block.is_valid(difficulty) {
                return MiningResult::Success(block);
            }

            block.nonce = block.nonce.wrapping_add(1);
        }
    }
}
