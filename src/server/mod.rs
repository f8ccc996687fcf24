//! HTTP API over an opened board.
//!
//! `plank serve` wraps the same stores the CLI uses; every handler runs
//! its store call on a blocking thread, so the file locks behave exactly
//! as they do for concurrent CLI processes.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::Context;

pub use api::{AppState, SharedState, ACTOR_HEADER};

pub fn build_router(state: SharedState, permissive_cors: bool) -> Router {
    let router = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serve the API until ctrl-c.
pub async fn start_server(ctx: Context, addr: SocketAddr) -> anyhow::Result<()> {
    let permissive_cors = ctx.config.server.permissive_cors;
    let root = ctx.root();
    let state = Arc::new(AppState::new(ctx));
    let app = build_router(state, permissive_cors);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr().context("failed to read bound address")?;
    tracing::info!(addr = %local, root = %root.display(), "plank api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("plank api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
