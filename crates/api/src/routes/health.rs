use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
}

/// Liveness probe for uptime monitors. No auth.
async fn home() -> Json<Value> {
    Json(json!({ "status": "alive", "bot": "FiboBot" }))
}

/// Health check with scheduler progress. No auth.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.scheduler.snapshot().await;
    let uptime = state.scheduler.uptime().await;
    Json(json!({
        "status": "healthy",
        "service": "fibobot",
        "uptime_secs": uptime.num_seconds(),
        "last_daily": snapshot.last_daily,
        "last_hourly": snapshot.last_hourly,
        "aligned_pairs": snapshot.book.aligned().count(),
        "signals_sent": snapshot.signals_sent,
    }))
}
