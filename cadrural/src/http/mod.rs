//! JSON API over a [`Client`].
//!
//! Every route lives under `/api/v1`:
//! - CRUD and filtered lists for produtores-rurais, propriedades, unidades-producao and rebanhos
//! - dashboard figures and relatórios
//! - CSV exports of properties and of one producer's herds
//! - document upload, listing, download and removal

mod api_error;
mod documents;
mod exports;
mod reports;
mod resources;

pub use api_error::ApiError;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use log::{info, warn};
use serde_json::json;
use tokio::net::TcpListener;

use crate::{
    client::Client,
    models::{Herd, Producer, ProductionUnit, Property},
};

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(client: Client) -> Router {
    let body_limit = usize::try_from(client.documents().max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/health", get(health))
        .merge(resources::routes::<Producer>("/produtores-rurais"))
        .merge(resources::routes::<Property>("/propriedades"))
        .merge(resources::routes::<ProductionUnit>("/unidades-producao"))
        .merge(resources::routes::<Herd>("/rebanhos"))
        .merge(reports::routes())
        .merge(exports::routes())
        .merge(documents::routes());

    Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(client)
}

/// Serves the API on `bind` until Ctrl-C.
pub async fn serve(client: Client, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            warn!("could not listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "success": true }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Rota não encontrada." })),
    )
}
