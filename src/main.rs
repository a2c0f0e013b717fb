//! Ledger node
//!
//! Serves the node HTTP surface, joins the network through the discovery
//! service and optionally runs the mining loop.

use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use ledger_node::api::{node_router, serve};
use ledger_node::init_tracing;
use ledger_node::node::{
    detect_self_ip, run_mining_loop, Config, EventBus, NodeContext, NodeError, Repos,
};

#[derive(Parser)]
#[command(version, about = "Replicated proof-of-work ledger node")]
struct Args {
    /// Run the background mining loop
    #[arg(long)]
    mine: bool,
    /// Overwrite the local ledger with a fresh genesis chain before joining
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing();

    if let Err(e) = run(args).await {
        error!("{}", e);
        exit(1);
    }
}

async fn run(args: Args) -> Result<(), NodeError> {
    let config = Config::from_env()?;
    let repos = Repos::open(&config)?;

    if args.init {
        repos.blockchain.create()?;
        info!("local blockchain reset to genesis");
    }

    let self_ip = detect_self_ip(&config.dns_host, config.dns_port).await?;
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;

    let ctx = Arc::new(NodeContext::new(
        config,
        self_ip,
        repos,
        EventBus::with_node_handlers(),
    ));
    info!(name = %ctx.self_node.name, host = %ctx.self_node.host(), "starting node");

    let server = tokio::spawn(serve(listener, node_router(Arc::clone(&ctx)), shutdown_signal()));

    ctx.init().await?;

    let mining = if args.mine {
        Some(tokio::spawn(run_mining_loop(Arc::clone(&ctx))))
    } else {
        None
    };

    match server.await {
        Ok(Ok(())) => info!("server stopped"),
        Ok(Err(e)) => error!("server error: {}", e),
        Err(e) => error!("server task failed: {}", e),
    }

    ctx.miner.stop();
    if let Some(mining) = mining {
        mining.abort();
        if let Err(e) = mining.await {
            if !e.is_cancelled() {
                warn!("mining task failed: {}", e);
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("shutdown signal received, stopping node");
}
