//! Wallet service HTTP surface

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::{with_layers, ApiError};
use crate::storage::WalletRepo;
use crate::wallet::Wallet;

pub fn wallets_router(repo: WalletRepo) -> Router {
    with_layers(
        Router::new()
            .route("/wallets/new", get(new_wallet))
            .with_state(repo),
    )
}

async fn new_wallet(State(repo): State<WalletRepo>) -> Result<Json<Wallet>, ApiError> {
    let wallet = repo
        .create_wallet()
        .map_err(|e| ApiError::unavailable("wallets", e))?;
    info!(address = %wallet.address_hex(), "wallet created");

    Ok(Json(wallet))
}
