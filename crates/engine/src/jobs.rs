use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use common::{CandleSource, Heartbeat, Notifier, PairTrendState, SignalStore};
use strategy::{Scanner, TrendBook};

use crate::scheduler::SchedulerState;

/// The scheduled work: daily classification, hourly detection, heartbeat.
///
/// Each job logs its own failures; none of them return errors to the
/// scheduler loop.
pub struct Jobs {
    scanner: Scanner,
    store: Arc<dyn SignalStore>,
    source: Arc<dyn CandleSource>,
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<SchedulerState>>,
}

impl Jobs {
    pub fn new(
        scanner: Scanner,
        store: Arc<dyn SignalStore>,
        source: Arc<dyn CandleSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scanner,
            store,
            source,
            notifier,
            state: Arc::new(RwLock::new(SchedulerState::new(Utc::now()))),
        }
    }

    pub fn state(&self) -> Arc<RwLock<SchedulerState>> {
        self.state.clone()
    }

    /// Seed the book from the last persisted classification so hourly scans
    /// can run before the next daily pass.
    pub async fn restore(&self) {
        match self.store.pair_states().await {
            Ok(states) => {
                let book = TrendBook::from_states(states);
                info!(pairs = book.len(), aligned = book.aligned().count(), "Trend book restored");
                self.state.write().await.book = book;
            }
            Err(e) => warn!(error = %e, "Could not restore trend book"),
        }
    }

    pub async fn daily(&self) {
        let pairs = self.scanner.config().pairs.clone();
        let book = self.scanner.classify_daily_alignment(&pairs).await;
        let states: Vec<PairTrendState> = book.states().cloned().collect();

        {
            let mut state = self.state.write().await;
            state.book = book;
            state.last_daily = Some(Utc::now());
        }

        if let Err(e) = self.notifier.notify_daily_summary(&states).await {
            error!(error = %e, "Failed to send daily summary");
        }
    }

    pub async fn hourly(&self) {
        let book = self.state.read().await.book.clone();
        let signals = self.scanner.scan_hourly(&book).await;

        let mut sent = 0u64;
        for signal in &signals {
            match self.notifier.notify_signal(signal).await {
                Ok(()) => sent += 1,
                Err(e) => error!(symbol = %signal.symbol, error = %e, "Failed to send signal"),
            }
        }

        let mut state = self.state.write().await;
        state.last_hourly = Some(Utc::now());
        state.signals_sent += sent;
    }

    pub async fn heartbeat(&self) {
        let heartbeat = {
            let state = self.state.read().await;
            Heartbeat {
                uptime: Utc::now() - state.started_at,
                aligned_pairs: state.book.aligned().count(),
                usage: None,
            }
        };
        let heartbeat = Heartbeat {
            usage: self.source.usage().await,
            ..heartbeat
        };

        match self.notifier.notify_heartbeat(&heartbeat).await {
            Ok(()) => info!(aligned = heartbeat.aligned_pairs, "Heartbeat sent"),
            Err(e) => error!(error = %e, "Failed to send heartbeat"),
        }
        self.state.write().await.last_heartbeat = Some(Utc::now());
    }
}
