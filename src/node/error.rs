use thiserror::Error;

use super::ConfigError;
use crate::p2p::ClientError;
use crate::storage::{RepoError, StoreError};
use crate::wallet::WalletError;

/// Orchestration errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("peer request failed: {0}")]
    Client(#[from] ClientError),
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no wallet available for mining rewards")]
    NoWallet,
    #[error("background task failed: {0}")]
    Task(String),
}
