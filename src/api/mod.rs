//! HTTP surfaces
//!
//! Axum routers for the node, the discovery service and the wallet
//! service. Every router gets a permissive CORS layer and request tracing.

mod dns;
mod error;
mod node;
mod wallets;

pub use dns::*;
pub use error::*;
pub use node::*;
pub use wallets::*;

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

fn with_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` completes
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
