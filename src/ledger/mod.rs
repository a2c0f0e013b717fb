//! Ledger module - transactions, blocks, and the replicated chain

mod error;
mod transaction;
mod block;
mod blockchain;

pub use error::*;
pub use transaction::*;
pub use block::*;
pub use blockchain::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
