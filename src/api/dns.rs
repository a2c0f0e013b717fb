//! Discovery service HTTP surface

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::{with_layers, ApiError};
use crate::p2p::Node;
use crate::storage::NodeRepo;

pub fn dns_router(repo: NodeRepo) -> Router {
    with_layers(
        Router::new()
            .route("/nodes", get(get_nodes).post(add_node))
            .with_state(repo),
    )
}

async fn get_nodes(State(repo): State<NodeRepo>) -> Result<Json<Vec<Node>>, ApiError> {
    let nodes = repo
        .get_nodes()
        .map_err(|e| ApiError::unavailable("nodes", e))?;
    Ok(Json(nodes))
}

/// Upsert keyed by name
async fn add_node(
    State(repo): State<NodeRepo>,
    payload: Result<Json<Node>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let Json(node) = payload?;
    if node.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    repo.add_node(node.clone())
        .map_err(|e| ApiError::unavailable("nodes", e))?;
    info!(name = %node.name, host = %node.host(), "node registered");

    Ok((StatusCode::CREATED, Json(node)))
}
