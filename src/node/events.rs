//! Event dispatch
//!
//! Events are a closed set of variants with typed payloads. The bus maps
//! each kind to one handler and runs every dispatch on its own task; the
//! publisher never waits for or observes the outcome.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::NodeContext;
use crate::ledger::{Block, Transaction};

/// Something that happened on this node
#[derive(Debug, Clone)]
pub enum Event {
    /// A client submitted a transaction that made it into the pool
    TransactionReceived(Transaction),
    /// A block was mined, accepted by peers and committed
    BlockMined(Block),
    /// A mined block was rejected by peers or by the local chain
    BlockMiningFailed,
    /// At least one peer refused a connection
    PeerUnreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransactionReceived,
    BlockMined,
    BlockMiningFailed,
    PeerUnreachable,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TransactionReceived(_) => EventKind::TransactionReceived,
            Event::BlockMined(_) => EventKind::BlockMined,
            Event::BlockMiningFailed => EventKind::BlockMiningFailed,
            Event::PeerUnreachable => EventKind::PeerUnreachable,
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: Arc<NodeContext>, event: Event);
}

/// Registry of one handler per event kind
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventBus {
    /// A bus with no handlers; every dispatch is dropped
    pub fn new() -> Self {
        Self::default()
    }

    /// The handlers a running node uses
    pub fn with_node_handlers() -> Self {
        let mut bus = Self::new();
        bus.register(EventKind::TransactionReceived, ReplicateTransaction);
        bus.register(EventKind::BlockMined, RewardMiner);
        bus.register(EventKind::BlockMiningFailed, ResolveAfterFailure);
        bus.register(EventKind::PeerUnreachable, RefreshPeers);
        bus
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn register<H>(&mut self, kind: EventKind, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Spawn the handler registered for `event`'s kind
    pub fn dispatch(&self, ctx: Arc<NodeContext>, event: Event) -> Option<JoinHandle<()>> {
        let kind = event.kind();
        let handler = match self.handlers.get(&kind) {
            Some(handler) => Arc::clone(handler),
            None => {
                debug!(?kind, "no handler registered");
                return None;
            }
        };

        debug!(?kind, "dispatching event");
        Some(tokio::spawn(async move { handler.handle(ctx, event).await }))
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Best-effort replication of a pooled transaction
pub struct ReplicateTransaction;

#[async_trait]
impl EventHandler for ReplicateTransaction {
    async fn handle(&self, ctx: Arc<NodeContext>, event: Event) {
        if let Event::TransactionReceived(tx) = event {
            ctx.replicate_tx(&tx).await;
        }
    }
}

/// Pay the mining reward and replicate it
pub struct RewardMiner;

#[async_trait]
impl EventHandler for RewardMiner {
    async fn handle(&self, ctx: Arc<NodeContext>, event: Event) {
        let block = match event {
            Event::BlockMined(block) => block,
            _ => return,
        };

        match ctx.reward_miner().await {
            Ok(tx) => info!(block = block.idx, tx = %tx.id, "mining reward added"),
            Err(e) => error!(block = block.idx, "failed to add mining reward: {}", e),
        }
    }
}

/// Fall back to the longest chain after a rejected block
pub struct ResolveAfterFailure;

#[async_trait]
impl EventHandler for ResolveAfterFailure {
    async fn handle(&self, ctx: Arc<NodeContext>, _event: Event) {
        match ctx.resolve_longest_chain().await {
            Ok(resolution) if resolution.unreachable => {
                ctx.dispatch(Event::PeerUnreachable);
            }
            Ok(_) => {}
            Err(e) => error!("failed to resolve longest blockchain: {}", e),
        }
    }
}

/// Reload the peer list from discovery, then resolve against the fresh set.
///
/// Never dispatches `PeerUnreachable` itself.
pub struct RefreshPeers;

#[async_trait]
impl EventHandler for RefreshPeers {
    async fn handle(&self, ctx: Arc<NodeContext>, _event: Event) {
        match ctx.refresh_peers().await {
            Ok(count) => info!(peers = count, "peer list refreshed"),
            Err(e) => warn!("failed to refresh peers: {}", e),
        }

        if let Err(e) = ctx.resolve_longest_chain().await {
            error!("failed to resolve longest blockchain: {}", e);
        }
    }
}
