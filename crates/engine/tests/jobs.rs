use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use common::{
    ApiUsage, Candle, CandleSource, Error, Heartbeat, Notifier, PairTrendState, Resolution,
    Result, Signal, SignalStore, Trend,
};
use engine::{Jobs, SqliteStore};
use strategy::{Scanner, ScannerConfig};

struct FakeSource {
    series: HashMap<Resolution, Vec<Candle>>,
}

#[async_trait]
impl CandleSource for FakeSource {
    async fn fetch(&self, symbol: &str, resolution: Resolution, _count: usize) -> Result<Vec<Candle>> {
        if symbol != "EUR/USD" {
            return Ok(Vec::new());
        }
        Ok(self.series.get(&resolution).cloned().unwrap_or_default())
    }

    async fn usage(&self) -> Option<ApiUsage> {
        Some(ApiUsage { used: 42, limit: 800 })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    fail: bool,
    signals: Mutex<Vec<Signal>>,
    summaries: Mutex<Vec<Vec<PairTrendState>>>,
    heartbeats: Mutex<Vec<Heartbeat>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_signal(&self, signal: &Signal) -> Result<()> {
        if self.fail {
            return Err(Error::Notify("chat unreachable".into()));
        }
        self.signals.lock().unwrap().push(signal.clone());
        Ok(())
    }

    async fn notify_daily_summary(&self, states: &[PairTrendState]) -> Result<()> {
        self.summaries.lock().unwrap().push(states.to_vec());
        Ok(())
    }

    async fn notify_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        self.heartbeats.lock().unwrap().push(heartbeat.clone());
        Ok(())
    }
}

fn ohlc(points: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    points
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: base + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 0.0,
        })
        .collect()
}

fn flat(closes: &[f64]) -> Vec<Candle> {
    ohlc(&closes.iter().map(|&c| (c, c, c, c)).collect::<Vec<_>>())
}

/// Zigzag up to a 1.40 peak, pullback, green Heiken-Ashi close at 1.19
/// inside the first bullish zone.
fn hourly() -> Vec<Candle> {
    let zigzag = [
        (1.20, 1.10),
        (1.15, 1.00),
        (1.25, 1.12),
        (1.16, 1.02),
        (1.26, 1.13),
        (1.17, 1.04),
        (1.27, 1.14),
        (1.18, 1.06),
        (1.28, 1.15),
        (1.19, 1.08),
        (1.40, 1.20),
    ];
    let mut points: Vec<(f64, f64, f64, f64)> = zigzag
        .iter()
        .map(|&(h, l)| ((h + l) / 2.0, h, l, (h + l) / 2.0))
        .collect();
    points.extend([
        (1.30, 1.30, 1.18, 1.24),
        (1.24, 1.29, 1.15, 1.16),
        (1.16, 1.28, 1.14, 1.15),
        (1.15, 1.27, 1.13, 1.14),
        (1.14, 1.26, 1.12, 1.13),
        (1.20, 1.25, 1.12, 1.19),
    ]);
    ohlc(&points)
}

async fn setup(notifier: Arc<RecordingNotifier>) -> (Jobs, SqliteStore) {
    let source: Arc<dyn CandleSource> = Arc::new(FakeSource {
        series: HashMap::from([
            (Resolution::Weekly, flat(&[1.0, 1.0, 1.3])),
            (Resolution::Daily, flat(&[1.1, 1.1, 1.2])),
            (Resolution::Hourly, hourly()),
        ]),
    });
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let config = ScannerConfig {
        pairs: vec!["EUR/USD".into(), "GBP/USD".into()],
        sma_period: 3,
        ..ScannerConfig::default()
    };
    let scanner = Scanner::new(source.clone(), Arc::new(store.clone()), config);
    let jobs = Jobs::new(scanner, Arc::new(store.clone()), source, notifier);
    (jobs, store)
}

#[tokio::test]
async fn daily_then_hourly_notifies_and_persists() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (jobs, store) = setup(notifier.clone()).await;

    jobs.daily().await;
    {
        let state = jobs.state();
        let state = state.read().await;
        assert!(state.last_daily.is_some());
        assert_eq!(state.book.trend("EUR/USD"), Trend::Bullish);
    }
    let summaries = notifier.summaries.lock().unwrap().clone();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].len(), 1);

    jobs.hourly().await;
    let signals = notifier.signals.lock().unwrap().clone();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].symbol, "EUR/USD");
    assert_eq!(jobs.state().read().await.signals_sent, 1);

    let logged = store.recent_signals(Duration::hours(24), Some("EUR/USD")).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].projection_index, 1);
}

#[tokio::test]
async fn notify_failure_does_not_lose_the_signal() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });
    let (jobs, store) = setup(notifier).await;

    jobs.daily().await;
    jobs.hourly().await;

    assert_eq!(jobs.state().read().await.signals_sent, 0);
    let logged = store.recent_signals(Duration::hours(24), None).await.unwrap();
    assert_eq!(logged.len(), 1);
}

#[tokio::test]
async fn restore_rebuilds_book_from_store() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (jobs, store) = setup(notifier.clone()).await;
    jobs.daily().await;

    // Fresh jobs over the same database.
    let source: Arc<dyn CandleSource> = Arc::new(FakeSource { series: HashMap::new() });
    let scanner = Scanner::new(source.clone(), Arc::new(store.clone()), ScannerConfig::default());
    let fresh = Jobs::new(scanner, Arc::new(store), source, notifier);
    assert!(fresh.state().read().await.book.is_empty());
    fresh.restore().await;
    assert_eq!(fresh.state().read().await.book.trend("EUR/USD"), Trend::Bullish);
}

#[tokio::test]
async fn heartbeat_reports_alignment_and_credits() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (jobs, _store) = setup(notifier.clone()).await;
    jobs.daily().await;
    jobs.heartbeat().await;

    let heartbeats = notifier.heartbeats.lock().unwrap().clone();
    assert_eq!(heartbeats.len(), 1);
    assert_eq!(heartbeats[0].aligned_pairs, 1);
    assert_eq!(heartbeats[0].usage, Some(ApiUsage { used: 42, limit: 800 }));
    assert!(jobs.state().read().await.last_heartbeat.is_some());
}
