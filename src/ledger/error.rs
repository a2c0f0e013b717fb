use thiserror::Error;

/// Ledger validation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid transaction signature")]
    InvalidSignature,
    #[error("sender address does not match the public key of the signature")]
    UnknownSender,
    #[error("sender has insufficient funds: balance {balance}, amount {amount}")]
    InsufficientFunds { balance: f64, amount: f64 },
    #[error("transaction amount must be positive")]
    InvalidAmount,
    #[error("transaction {0} is already known")]
    DuplicateTransaction(String),
    #[error("no pending transactions found")]
    NoPendingTransactions,
    #[error("blockchain has no genesis block")]
    MissingGenesis,
    #[error("block prevHash does not match the last block's hash")]
    PrevHashMismatch,
    #[error("block idx {got} does not follow last block idx {last}")]
    IndexMismatch { last: i64, got: i64 },
    #[error("block hash does not start with {difficulty} '0' bytes")]
    InsufficientWork { difficulty: usize },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
