//! Discovery service
//!
//! Keeps the list of nodes that announced themselves.

use std::process::exit;

use tokio::net::TcpListener;
use tracing::error;

use ledger_node::api::{dns_router, serve};
use ledger_node::init_tracing;
use ledger_node::node::{NodeError, ServiceConfig};
use ledger_node::storage::NodeRepo;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!("{}", e);
        exit(1);
    }
}

async fn run() -> Result<(), NodeError> {
    let config = ServiceConfig::from_env("NODES_FILENAME")?;
    let repo = NodeRepo::open(&config.filename)?;

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    serve(listener, dns_router(repo), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
