//! HTTP API for the claimsift service.
//!
//! Two routes: a health probe and the extract endpoint that runs the claim
//! pipeline against the configured document and returns the report as JSON.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ServiceError;
use crate::extraction::ClaimExtractor;
use crate::extraction::report::ClaimReport;

/// Application state
pub struct AppState {
    pub extractor: Arc<ClaimExtractor>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(extractor: Arc<ClaimExtractor>) -> Router {
    let state = Arc::new(AppState {
        extractor,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/extract", get(extract_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        document_available: state.extractor.document_path().exists(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    document_available: bool,
}

// === Extraction ===

/// Run the claim pipeline and return the assembled report.
///
/// Extraction is CPU-bound (rasterization, contour analysis), so it runs on
/// a blocking worker thread.
async fn extract_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClaimReport>, ServiceError> {
    let extractor = state.extractor.clone();

    let report = tokio::task::spawn_blocking(move || extractor.extract())
        .await
        .map_err(|e| ServiceError::Internal {
            message: format!("Extraction task failed: {}", e),
        })??;

    Ok(Json(report))
}
