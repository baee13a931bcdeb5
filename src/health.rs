//! Liveness endpoint for hosting platforms that expect a bound port.

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .layer(TraceLayer::new_for_http())
}

async fn alive() -> &'static str {
    "Bot is alive!"
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting health check server");
    axum::serve(listener, router()).await?;
    Ok(())
}
