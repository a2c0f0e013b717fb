//! Explicit handles shared by every node component

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{Config, Event, EventBus};
use crate::mining::Miner;
use crate::p2p::{DiscoveryClient, Node, PeerClient, WalletClient};
use crate::storage::{BlockchainRepo, NodeRepo, StoreError, WalletRepo};

/// The three persisted collections of a node
#[derive(Debug, Clone)]
pub struct Repos {
    pub blockchain: BlockchainRepo,
    pub nodes: NodeRepo,
    pub wallets: WalletRepo,
}

impl Repos {
    /// Open the databases named in the configuration
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        Ok(Self {
            blockchain: BlockchainRepo::open(&config.blockchain_filename)?,
            nodes: NodeRepo::open(&config.nodes_filename)?,
            wallets: WalletRepo::open(&config.wallets_filename)?,
        })
    }

    pub fn temporary() -> Result<Self, StoreError> {
        Ok(Self {
            blockchain: BlockchainRepo::temporary()?,
            nodes: NodeRepo::temporary()?,
            wallets: WalletRepo::temporary()?,
        })
    }
}

/// Everything a handler, the miner, or an HTTP route needs
pub struct NodeContext {
    pub config: Config,
    /// How this node announces itself
    pub self_node: Node,
    pub blockchain: BlockchainRepo,
    pub nodes: NodeRepo,
    pub wallets: WalletRepo,
    pub peers: PeerClient,
    pub discovery: DiscoveryClient,
    pub wallet_service: WalletClient,
    pub miner: Miner,
    events: EventBus,
}

impl NodeContext {
    pub fn new(config: Config, self_ip: impl Into<String>, repos: Repos, events: EventBus) -> Self {
        let self_node = Node::new(config.node_name.clone(), self_ip, config.port);
        let discovery = DiscoveryClient::new(config.dns_url());
        let wallet_service = WalletClient::new(config.wallets_url());

        Self {
            config,
            self_node,
            blockchain: repos.blockchain,
            nodes: repos.nodes,
            wallets: repos.wallets,
            peers: PeerClient::new(),
            discovery,
            wallet_service,
            miner: Miner::new(),
            events,
        }
    }

    /// Hand `event` to its registered handler on a new task
    pub fn dispatch(self: &Arc<Self>, event: Event) -> Option<JoinHandle<()>> {
        self.events.dispatch(Arc::clone(self), event)
    }
}
