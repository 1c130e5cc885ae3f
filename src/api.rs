use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::{SlotStore, StreamKey};
use crate::config::ServeMode;
use crate::pipeline::{Orchestrator, StreamError};
use crate::rewrite::ProcessedItem;
use crate::sources::mediastack::MediastackAdapter;
use crate::sources::SourceError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Durable per-stream documents: written by the cron trigger, read by
    /// the serving path in produced mode.
    pub durable: Arc<dyn SlotStore>,
    pub serve_mode: ServeMode,
    /// Probe adapter for the raw diagnostic endpoint.
    pub raw_probe: Arc<MediastackAdapter>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(general_news))
        .route("/uplifting-news", get(uplifting_news))
        .route("/news/raw", get(raw_headlines))
        .route("/cron/process-daily-news", get(process_daily_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Status mapping: 404 for not-yet-produced, 500 for configuration
/// failures (caught before any network call), 502 for upstream failures.
fn stream_error_response(key: StreamKey, err: StreamError) -> Response {
    match err {
        StreamError::NotProduced => error_response(
            StatusCode::NOT_FOUND,
            format!("{key} has not been produced yet"),
        ),
        StreamError::Source(SourceError::MissingCredentials(var)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("missing credentials: {var}"),
        ),
        StreamError::Source(e) => {
            error_response(StatusCode::BAD_GATEWAY, format!("failed to fetch {key}: {e}"))
        }
    }
}

async fn produced_only(state: &AppState, key: StreamKey) -> Result<Vec<ProcessedItem>, StreamError> {
    state
        .durable
        .get(key)
        .await
        .and_then(|slot| slot.processed_items)
        .filter(|items| !items.is_empty())
        .ok_or(StreamError::NotProduced)
}

async fn serve_stream(state: &AppState, key: StreamKey) -> Response {
    let result = match state.serve_mode {
        ServeMode::Live => state.orchestrator.serve(key).await,
        ServeMode::Produced => produced_only(state, key).await,
    };
    match result {
        Ok(items) => Json(items).into_response(),
        Err(e) => stream_error_response(key, e),
    }
}

async fn general_news(State(state): State<AppState>) -> Response {
    serve_stream(&state, StreamKey::General).await
}

async fn uplifting_news(State(state): State<AppState>) -> Response {
    serve_stream(&state, StreamKey::Uplifting).await
}

/// Unprocessed multi-country headline snapshot, straight from the news
/// API. Diagnostic surface only; no selection or rewrite runs here.
async fn raw_headlines(State(state): State<AppState>) -> Response {
    match state.raw_probe.headline_snapshot().await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to fetch news: {e}"),
        ),
    }
}

/// Scheduled production trigger: runs both streams and writes their
/// processed output into the durable store. Always answers with a
/// structured envelope.
async fn process_daily_news(State(state): State<AppState>) -> Response {
    let report = state.orchestrator.run_all(&*state.durable).await;
    if report.success {
        Json(json!({ "success": true, "message": report.message })).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": report.message })),
        )
            .into_response()
    }
}
