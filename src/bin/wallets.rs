//! Wallet service
//!
//! Generates and stores key pairs for nodes and clients.

use std::process::exit;

use tokio::net::TcpListener;
use tracing::error;

use ledger_node::api::{serve, wallets_router};
use ledger_node::init_tracing;
use ledger_node::node::{NodeError, ServiceConfig};
use ledger_node::storage::WalletRepo;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!("{}", e);
        exit(1);
    }
}

async fn run() -> Result<(), NodeError> {
    let config = ServiceConfig::from_env("WALLETS_FILENAME")?;
    let repo = WalletRepo::open(&config.filename)?;

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    serve(listener, wallets_router(repo), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
