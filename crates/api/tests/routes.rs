use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use api::{router, AppState};
use common::{Direction, PairTrendState, Signal, SignalStore, Trend};
use engine::{SchedulerHandle, SchedulerState, SqliteStore};

async fn app(token: Option<&str>) -> (Router, SqliteStore) {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let state = AppState {
        store: Arc::new(store.clone()),
        scheduler: SchedulerHandle::detached(SchedulerState::new(Utc::now() - Duration::hours(2))),
        dashboard_token: token.map(str::to_string),
    };
    (router(state), store)
}

async fn get(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    if let Some(t) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn signal(symbol: &str, age: Duration) -> Signal {
    Signal {
        symbol: symbol.into(),
        direction: Direction::Bearish,
        price: 150.123,
        projection_index: 2,
        projection_count: 3,
        zone_min: 150.0,
        zone_max: 150.5,
        rsi_divergence: false,
        sr_confluence: true,
        confirmed: true,
        detected_at: Utc::now() - age,
    }
}

#[tokio::test]
async fn root_reports_alive() {
    let (app, _) = app(None).await;
    let (status, body) = get(app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
    assert_eq!(body["bot"], "FiboBot");
}

#[tokio::test]
async fn health_is_open_even_with_token() {
    let (app, _) = app(Some("secret")).await;
    let (status, body) = get(app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_secs"].as_i64().unwrap() >= 7200);
    assert!(body["last_daily"].is_null());
    assert_eq!(body["aligned_pairs"], 0);
}

#[tokio::test]
async fn api_requires_bearer_when_configured() {
    let (app, _) = app(Some("secret")).await;
    let (status, _) = get(app.clone(), "/api/pairs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get(app.clone(), "/api/pairs", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = get(app, "/api/pairs", Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn pairs_lists_persisted_states() {
    let (app, store) = app(None).await;
    store
        .write_pair_state(&PairTrendState {
            symbol: "USD/JPY".into(),
            trend: Trend::Bearish,
            weekly_price: 150.0,
            weekly_sma: 152.0,
            daily_price: 150.0,
            daily_sma: 151.0,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let (status, body) = get(app, "/api/pairs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["pairs"][0]["symbol"], "USD/JPY");
    assert_eq!(body["pairs"][0]["trend"], "BEARISH");
}

#[tokio::test]
async fn signals_respect_window_and_symbol() {
    let (app, store) = app(None).await;
    store.write_signal(&signal("USD/JPY", Duration::hours(1))).await.unwrap();
    store.write_signal(&signal("EUR/USD", Duration::hours(2))).await.unwrap();
    store.write_signal(&signal("USD/JPY", Duration::hours(30))).await.unwrap();

    let (_, body) = get(app.clone(), "/api/signals", None).await;
    assert_eq!(body["hours"], 24);
    assert_eq!(body["total"], 2);

    let (_, body) = get(app.clone(), "/api/signals?hours=48&symbol=USD/JPY", None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["signals"][0]["projection_index"], 2);

    let (_, body) = get(app, "/api/signals?hours=0", None).await;
    assert_eq!(body["hours"], 1);
    assert_eq!(body["total"], 0);
}
