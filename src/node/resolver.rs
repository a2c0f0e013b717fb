//! Consensus resolution
//!
//! Fetches every peer's chain and adopts the longest candidate, the local
//! chain included.

use tracing::{debug, info, warn};

use super::{NodeContext, NodeError};

/// Result of one resolution round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Peer chains that passed validation
    pub peer_chains: usize,
    /// The local block list changed
    pub replaced: bool,
    /// Some peer refused the connection
    pub unreachable: bool,
}

impl NodeContext {
    /// Adopt the longest chain among peers and the local one.
    ///
    /// Peers that error or serve an invalid chain are left out. The caller
    /// decides whether `unreachable` should trigger a peer refresh.
    pub async fn resolve_longest_chain(&self) -> Result<Resolution, NodeError> {
        let peers = self.nodes.get_nodes()?;
        let bulk = self.peers.get_blockchains(&peers).await;

        let unreachable = bulk.has_connection_refused();
        if bulk.has_errors() {
            debug!(errors = %bulk.errors(), "some peers did not return a blockchain");
        }

        let difficulty = self.config.mining_difficulty;
        let chains: Vec<_> = bulk
            .into_successes()
            .into_iter()
            .filter(|chain| {
                let valid = chain.is_valid_chain(difficulty);
                if !valid {
                    warn!(blocks = chain.len(), "discarding invalid peer blockchain");
                }
                valid
            })
            .collect();

        let peer_chains = chains.len();
        info!(count = peer_chains, "Retrieved blockchains");

        let replaced = self.blockchain.adopt_longest(chains)?;
        if replaced {
            info!("local blockchain replaced by peer chain");
        }

        Ok(Resolution {
            peer_chains,
            replaced,
            unreachable,
        })
    }
}
