//! Repositories over the persisted collections
//!
//! Every mutation runs the pure model operation inside `Store::with_lock`.

use std::path::Path;

use thiserror::Error;

use super::{Store, StoreError};
use crate::ledger::{longest_chain, Block, Blockchain, LedgerError, Transaction};
use crate::p2p::{upsert_node, Node};
use crate::wallet::Wallet;

/// Errors from a locked ledger mutation
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The node's chain and transaction pool
#[derive(Debug, Clone)]
pub struct BlockchainRepo {
    store: Store<Blockchain>,
}

impl BlockchainRepo {
    pub fn new(store: Store<Blockchain>) -> Self {
        Self { store }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Store::open(path)?))
    }

    pub fn temporary() -> Result<Self, StoreError> {
        Ok(Self::new(Store::temporary()?))
    }

    /// Current chain; empty if nothing was stored yet
    pub fn get(&self) -> Result<Blockchain, StoreError> {
        self.store.load()
    }

    /// Overwrite the stored chain
    pub fn replace(&self, chain: &Blockchain) -> Result<(), StoreError> {
        self.store.save(chain)
    }

    /// Store a fresh genesis-only chain, discarding whatever was there
    pub fn create(&self) -> Result<Blockchain, StoreError> {
        let chain = Blockchain::new();
        self.store.save(&chain)?;
        Ok(chain)
    }

    /// Create a genesis-only chain when none is stored; returns whether one was created
    pub fn ensure_genesis(&self) -> Result<bool, StoreError> {
        self.store.with_lock(|chain| {
            if !chain.is_empty() {
                return Ok(false);
            }
            *chain = Blockchain::new();
            Ok(true)
        })
    }

    pub fn add_tx(&self, tx: Transaction) -> Result<Transaction, RepoError> {
        self.store
            .with_lock(|chain| chain.add_tx(tx).map_err(RepoError::from))
    }

    /// Proof-of-work check and append in one critical section
    pub fn accept_block(&self, block: Block, difficulty: usize) -> Result<(), RepoError> {
        self.store.with_lock(|chain| {
            chain
                .accept_block(block, difficulty)
                .map_err(RepoError::from)
        })
    }

    /// Candidate block for the miner; read-only
    pub fn new_block(&self, max_txs: usize) -> Result<Block, RepoError> {
        Ok(self.get()?.new_block(max_txs)?)
    }

    /// Longest-chain selection over `peer_chains` followed by the stored chain.
    ///
    /// Selection and update happen in one critical section so a block
    /// committed concurrently is never lost. Returns whether the stored
    /// blocks changed.
    pub fn adopt_longest(&self, peer_chains: Vec<Blockchain>) -> Result<bool, StoreError> {
        self.store.with_lock(|chain| {
            let mut candidates = peer_chains;
            candidates.push(chain.clone());

            match longest_chain(candidates) {
                Some(winner) if !winner.is_empty() => {
                    let replaced = winner.blocks != chain.blocks;
                    chain.update(winner);
                    Ok(replaced)
                }
                _ => Ok(false),
            }
        })
    }
}

/// Known peers
#[derive(Debug, Clone)]
pub struct NodeRepo {
    store: Store<Vec<Node>>,
}

impl NodeRepo {
    pub fn new(store: Store<Vec<Node>>) -> Self {
        Self { store }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Store::open(path)?))
    }

    pub fn temporary() -> Result<Self, StoreError> {
        Ok(Self::new(Store::temporary()?))
    }

    pub fn get_nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.store.load()
    }

    /// Insert, or refresh ip and port of the node with the same name
    pub fn add_node(&self, node: Node) -> Result<(), StoreError> {
        self.store.with_lock(|nodes| {
            upsert_node(nodes, node);
            Ok(())
        })
    }

    pub fn replace_nodes(&self, nodes: Vec<Node>) -> Result<(), StoreError> {
        self.store.with_lock(|stored| {
            *stored = nodes;
            Ok(())
        })
    }
}

/// Stored wallets
#[derive(Debug, Clone)]
pub struct WalletRepo {
    store: Store<Vec<Wallet>>,
}

impl WalletRepo {
    pub fn new(store: Store<Vec<Wallet>>) -> Self {
        Self { store }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Store::open(path)?))
    }

    pub fn temporary() -> Result<Self, StoreError> {
        Ok(Self::new(Store::temporary()?))
    }

    pub fn get_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        self.store.load()
    }

    /// The first stored wallet, if any
    pub fn first(&self) -> Result<Option<Wallet>, StoreError> {
        Ok(self.get_wallets()?.into_iter().next())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.get_wallets()?.is_empty())
    }

    pub fn add_wallet(&self, wallet: Wallet) -> Result<(), StoreError> {
        self.store.with_lock(|wallets| {
            wallets.push(wallet);
            Ok(())
        })
    }

    /// Generate, store and return a new wallet
    pub fn create_wallet(&self) -> Result<Wallet, StoreError> {
        let wallet = Wallet::generate();
        self.add_wallet(wallet.clone())?;
        Ok(wallet)
    }
}
