//! Background mining loop
//!
//! One attempt: build a candidate from the pool, search for a nonce on a
//! blocking thread, offer the block to peers, and commit it only if at most
//! half of them refused it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::{Event, NodeContext, NodeError};
use crate::ledger::{Block, LedgerError, Transaction};
use crate::mining::MiningResult;
use crate::storage::RepoError;

/// Pause between two mining attempts
pub const MINING_INTERVAL: Duration = Duration::from_secs(5);

/// Highest share of erroring peers that still lets a block through
pub const MAX_BLOCK_ERROR_RATIO: f64 = 0.5;

/// Outcome of one mining attempt
#[derive(Debug)]
pub enum MiningOutcome {
    /// Accepted by peers and appended locally
    Committed(Block),
    /// Empty pool
    NoWork,
    /// Refused by peers or by the local chain; the pool is untouched
    Rejected(String),
    /// Stop signal raised during the nonce search
    Interrupted,
}

impl NodeContext {
    /// Run one mining attempt
    pub async fn mine_once(self: &Arc<Self>) -> Result<MiningOutcome, NodeError> {
        let difficulty = self.config.mining_difficulty;

        let candidate = match self.blockchain.new_block(self.config.txs_per_block) {
            Ok(block) => block,
            Err(RepoError::Ledger(LedgerError::NoPendingTransactions)) => {
                return Ok(MiningOutcome::NoWork)
            }
            Err(e) => return Err(e.into()),
        };

        info!(idx = candidate.idx, txs = candidate.txs.len(), "Mining...");
        let miner = self.miner.clone();
        let result = tokio::task::spawn_blocking(move || miner.mine_block(candidate, difficulty))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;

        let block = match result {
            MiningResult::Success(block) => block,
            MiningResult::Interrupted => return Ok(MiningOutcome::Interrupted),
        };
        info!("new block mined with nonce {}", block.nonce);

        let peers = self.nodes.get_nodes()?;
        let bulk = self.peers.share_block(&peers, &block).await;

        if bulk.has_connection_refused() {
            self.dispatch(Event::PeerUnreachable);
        }

        let ratio = bulk.error_ratio();
        if ratio > MAX_BLOCK_ERROR_RATIO {
            return Ok(MiningOutcome::Rejected(format!(
                "{:.0}% of peers rejected the block: {}",
                ratio * 100.0,
                bulk.errors()
            )));
        }

        match self.blockchain.accept_block(block.clone(), difficulty) {
            Ok(()) => Ok(MiningOutcome::Committed(block)),
            Err(RepoError::Ledger(e)) => Ok(MiningOutcome::Rejected(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Pool a coinbase transaction for the miner wallet and replicate it
    pub async fn reward_miner(self: &Arc<Self>) -> Result<Transaction, NodeError> {
        let wallet = self.miner_wallet()?;
        let reward = Transaction::coinbase(wallet.address_hex(), self.config.reward_amount);

        let tx = self.blockchain.add_tx(reward)?;
        self.replicate_tx(&tx).await;
        Ok(tx)
    }

    /// Best-effort fan-out of a pooled transaction
    pub async fn replicate_tx(self: &Arc<Self>, tx: &Transaction) {
        let peers = match self.nodes.get_nodes() {
            Ok(peers) => peers,
            Err(e) => {
                error!("failed to load peers: {}", e);
                return;
            }
        };

        let bulk = self.peers.share_tx(&peers, tx).await;
        if bulk.has_errors() {
            warn!(
                tx = %tx.id,
                "failed to share the transaction with other nodes: {}",
                bulk.errors()
            );
        }
        if bulk.has_connection_refused() {
            self.dispatch(Event::PeerUnreachable);
        }
    }
}

/// Mine until the miner's stop signal is raised
pub async fn run_mining_loop(ctx: Arc<NodeContext>) {
    info!(
        difficulty = ctx.config.mining_difficulty,
        txs_per_block = ctx.config.txs_per_block,
        "mining loop started"
    );

    while !ctx.miner.is_stopped() {
        match ctx.mine_once().await {
            Ok(MiningOutcome::Interrupted) => break,
            Ok(outcome) => {
                ctx.report_outcome(outcome);
            }
            Err(e) => error!("mining attempt failed: {}", e),
        }

        sleep(MINING_INTERVAL).await;
    }

    info!("mining loop stopped");
}

impl NodeContext {
    /// Log a finished attempt and dispatch the event it calls for
    pub fn report_outcome(self: &Arc<Self>, outcome: MiningOutcome) -> Option<JoinHandle<()>> {
        match outcome {
            MiningOutcome::Committed(block) => {
                info!("New block [OK] {}", block.idx);
                self.dispatch(Event::BlockMined(block))
            }
            MiningOutcome::Rejected(reason) => {
                warn!("New block [FAIL] {}", reason);
                self.dispatch(Event::BlockMiningFailed)
            }
            MiningOutcome::NoWork => {
                debug!("no pending transactions, skipping");
                None
            }
            MiningOutcome::Interrupted => None,
        }
    }
}
