//! Node startup and peer management

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use super::{Event, NodeContext, NodeError};
use crate::wallet::Wallet;

/// Local address of the route towards `host:port`.
///
/// Connecting a UDP socket sends nothing; it only selects the interface.
pub async fn detect_self_ip(host: &str, port: u16) -> std::io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((host, port)).await?;
    Ok(socket.local_addr()?.ip().to_string())
}

impl NodeContext {
    /// Register this node with the discovery service
    pub async fn announce(&self) -> Result<(), NodeError> {
        self.discovery.add_node(&self.self_node).await?;
        Ok(())
    }

    /// Replace the stored peer list with the discovery list minus this node
    pub async fn refresh_peers(&self) -> Result<usize, NodeError> {
        let peers: Vec<_> = self
            .discovery
            .get_nodes()
            .await?
            .into_iter()
            .filter(|node| node.name != self.self_node.name)
            .collect();

        let count = peers.len();
        self.nodes.replace_nodes(peers)?;
        Ok(count)
    }

    /// Announce this node to every known peer
    pub async fn ping_peers(self: &Arc<Self>) -> Result<(), NodeError> {
        let peers = self.nodes.get_nodes()?;
        let bulk = self.peers.ping(&peers, &self.self_node).await;

        if bulk.has_errors() {
            warn!(errors = %bulk.errors(), "failed to ping some peers");
        }
        if bulk.has_connection_refused() {
            self.dispatch(Event::PeerUnreachable);
        }
        Ok(())
    }

    /// The wallet mining rewards are paid to
    pub fn miner_wallet(&self) -> Result<Wallet, NodeError> {
        self.wallets.first()?.ok_or(NodeError::NoWallet)
    }

    /// Fetch a wallet from the wallet service unless one is stored already
    pub async fn ensure_wallet(&self) -> Result<Wallet, NodeError> {
        if let Some(wallet) = self.wallets.first()? {
            return Ok(wallet);
        }

        let wallet = self.wallet_service.new_wallet().await?;
        self.wallets.add_wallet(wallet.clone())?;
        info!(address = %wallet.address_hex(), "new miner wallet created");
        Ok(wallet)
    }

    /// Startup sequence.
    ///
    /// Discovery and wallet failures are fatal. Ping and resolution
    /// failures are logged; the node then starts from its local chain,
    /// creating a genesis chain if it has none.
    pub async fn init(self: &Arc<Self>) -> Result<(), NodeError> {
        self.announce().await?;

        let peers = self.refresh_peers().await?;
        info!(peers, "peers loaded from discovery");

        if let Err(e) = self.ping_peers().await {
            warn!("ping peers error: {}", e);
        }

        match self.resolve_longest_chain().await {
            Ok(resolution) if resolution.unreachable => {
                self.dispatch(Event::PeerUnreachable);
            }
            Ok(_) => {}
            Err(e) => warn!("failed to resolve longest blockchain: {}", e),
        }

        if self.blockchain.ensure_genesis()? {
            info!("created new blockchain");
        }

        self.ensure_wallet().await?;
        Ok(())
    }
}
