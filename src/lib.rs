//! Ledger node core library
//!
//! A minimal replicated proof-of-work ledger: nodes pool signed account
//! transactions, mine blocks, broadcast them to peers for quorum acceptance
//! and reconcile divergent chains with a longest-chain rule.

pub mod api;
pub mod crypto;
pub mod ledger;
pub mod mining;
pub mod node;
pub mod p2p;
pub mod storage;
pub mod wallet;

/// Install the global `tracing` subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
