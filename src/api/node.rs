//! Node HTTP surface

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use super::{with_layers, ApiError};
use crate::ledger::{Block, Blockchain, Transaction};
use crate::node::{Event, NodeContext};
use crate::p2p::Node;

type Ctx = State<Arc<NodeContext>>;

/// Routes a node serves to clients and peers
pub fn node_router(ctx: Arc<NodeContext>) -> Router {
    with_layers(
        Router::new()
            .route("/transactions", post(add_transaction))
            .route("/shared-transactions", post(add_shared_transaction))
            .route("/shared-blocks", post(add_shared_block))
            .route("/ping", post(ping))
            .route("/blockchain", get(get_blockchain))
            .with_state(ctx),
    )
}

fn validate_submitted(tx: &Transaction) -> Result<(), ApiError> {
    if tx.body.sender.is_empty() {
        return Err(ApiError::bad_request("sender is required"));
    }
    if tx.body.recipient.is_empty() {
        return Err(ApiError::bad_request("recipient is required"));
    }
    if tx.body.amount == 0.0 {
        return Err(ApiError::bad_request("amount is required"));
    }
    Ok(())
}

/// Client submission: admit, then replicate in the background
async fn add_transaction(
    State(ctx): Ctx,
    payload: Result<Json<Transaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(tx) = payload?;
    validate_submitted(&tx)?;

    let stored = ctx.blockchain.add_tx(tx)?;
    info!(tx = %stored.id, "transaction added to pool");
    ctx.dispatch(Event::TransactionReceived(stored.clone()));

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Replica from a peer; never re-broadcast
async fn add_shared_transaction(
    State(ctx): Ctx,
    payload: Result<Json<Transaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(tx) = payload?;

    let stored = ctx.blockchain.add_tx(tx)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn add_shared_block(
    State(ctx): Ctx,
    payload: Result<Json<Block>, JsonRejection>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    let Json(block) = payload?;

    ctx.blockchain
        .accept_block(block.clone(), ctx.config.mining_difficulty)?;
    info!(idx = block.idx, "shared block accepted");

    Ok((StatusCode::CREATED, Json(block)))
}

/// Remember the announcing node and answer with the known peers
async fn ping(
    State(ctx): Ctx,
    payload: Result<Json<Node>, JsonRejection>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let Json(node) = payload?;
    info!("ping from {}", node.host());

    if node.name != ctx.self_node.name {
        ctx.nodes.add_node(node)?;
    }

    Ok(Json(ctx.nodes.get_nodes()?))
}

async fn get_blockchain(State(ctx): Ctx) -> Result<Json<Blockchain>, ApiError> {
    let chain = ctx
        .blockchain
        .get()
        .map_err(|e| ApiError::unavailable("blockchain", e))?;
    Ok(Json(chain))
}
