use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{auth::require_auth, AppState};

/// Longest history `/api/signals` will return, in hours.
const MAX_SIGNAL_HOURS: i64 = 24 * 30;

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/pairs", get(get_pairs))
        .route("/api/signals", get(get_signals))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn internal_error(e: common::Error) -> Response {
    error!(error = %e, "API query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
        .into_response()
}

// ─── Pairs ────────────────────────────────────────────────────────────────────

async fn get_pairs(State(state): State<AppState>) -> Response {
    match state.store.pair_states().await {
        Ok(pairs) => Json(json!({
            "pairs": pairs,
            "total": pairs.len(),
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

// ─── Signals ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignalsQuery {
    hours: Option<i64>,
    symbol: Option<String>,
}

async fn get_signals(State(state): State<AppState>, Query(q): Query<SignalsQuery>) -> Response {
    let hours = q.hours.unwrap_or(24).clamp(1, MAX_SIGNAL_HOURS);
    let symbol = q.symbol.as_deref().filter(|s| !s.is_empty());

    match state.store.recent_signals(Duration::hours(hours), symbol).await {
        Ok(signals) => Json(json!({
            "signals": signals,
            "total": signals.len(),
            "hours": hours,
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}
