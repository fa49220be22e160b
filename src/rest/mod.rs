//! Public HTTP API server.
//!
//! Endpoints:
//!   GET    /tasks/          list all tasks
//!   POST   /tasks/          create a task
//!   GET    /tasks/{name}    fetch one task
//!   PATCH  /tasks/{name}    partial update
//!   PUT    /tasks/{name}    create or replace
//!   DELETE /tasks/{name}    delete
//!   GET    /health          liveness probe
//!
//! The collection routes answer with and without the trailing slash.

pub mod error;
pub mod extract;
pub mod routes;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppContext;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let collection = get(routes::tasks::list_tasks).post(routes::tasks::create_task);

    Router::new()
        .route("/health", get(routes::health::health))
        // Tasks
        .route("/tasks", collection.clone())
        .route("/tasks/", collection)
        .route(
            "/tasks/{name}",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .put(routes::tasks::upsert_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("HTTP API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(make_shutdown_future())
        .await?;
    Ok(())
}

/// Returns a future that resolves when a shutdown signal is received.
///
/// On Unix we listen for SIGTERM *and* Ctrl-C.
/// On other platforms we listen for Ctrl-C only.
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    info!("shutdown signal received");
}
