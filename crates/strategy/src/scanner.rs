use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use common::{
    ActiveZone, Candle, CandleSource, Direction, PairTrendState, Resolution, Result, Signal,
    SignalStore, Trend, ZoneStatus,
};

use crate::config::ScannerConfig;
use crate::indicators::fibonacci::{build_projections, match_zone, FibLevel, FibonacciProjection};
use crate::indicators::heiken_ashi::{is_body_outside_zone, to_heiken_ashi, HeikenAshiCandle};
use crate::indicators::technical::{
    check_level_confluence, classify_trend, find_support_resistance, moving_average,
};
use crate::indicators::RsiIndicator;
use crate::trend_book::TrendBook;

/// Result of one hourly evaluation, before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum HourlyOutcome {
    /// No projection could be built (short series or no candidate anchors).
    NoProjection,
    /// Projections exist but the latest close sits in none of their zones.
    OutsideZones { projections: usize },
    /// Price is inside a zone but the latest Heiken-Ashi candle disagrees.
    Unconfirmed { projection: FibonacciProjection },
    /// Zone match and color confirmation: a signal.
    Confirmed {
        projection: FibonacciProjection,
        signal: Signal,
    },
}

impl HourlyOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            HourlyOutcome::Confirmed { signal, .. } => Some(signal),
            _ => None,
        }
    }
}

/// Composes the analyzers into the daily alignment pass and the hourly
/// signal pass. Holds no state between calls; the trend handoff is the
/// `TrendBook` returned by the daily pass.
pub struct Scanner {
    source: Arc<dyn CandleSource>,
    store: Arc<dyn SignalStore>,
    config: ScannerConfig,
    rsi: RsiIndicator,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn CandleSource>,
        store: Arc<dyn SignalStore>,
        config: ScannerConfig,
    ) -> Self {
        let rsi = RsiIndicator::new(config.rsi_period);
        Self {
            source,
            store,
            config,
            rsi,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    // ─── Daily W1 + D1 ────────────────────────────────────────────────────────

    /// Classify every pair on weekly and daily SMA trend and persist the result.
    ///
    /// A pair is aligned only when both timeframes give the same non-neutral
    /// trend; otherwise it is recorded as `Neutral`. Failures are logged per
    /// pair and never abort the batch. A pair enters the returned book only
    /// after its record was persisted.
    pub async fn classify_daily_alignment(&self, pairs: &[String]) -> TrendBook {
        info!(pairs = pairs.len(), "Daily W1+D1 classification starting");
        let mut book = TrendBook::new();

        for symbol in pairs {
            match self.classify_and_persist(symbol).await {
                Ok(Some(state)) => book.insert(state),
                Ok(None) => {}
                Err(e) => error!(%symbol, error = %e, "Daily classification failed"),
            }
        }

        info!(
            classified = book.len(),
            bullish = book.symbols_with(Trend::Bullish).len(),
            bearish = book.symbols_with(Trend::Bearish).len(),
            "Daily W1+D1 classification finished"
        );
        book
    }

    async fn classify_and_persist(&self, symbol: &str) -> Result<Option<PairTrendState>> {
        let weekly = self
            .source
            .fetch(symbol, Resolution::Weekly, self.config.weekly_count)
            .await?;
        if weekly.is_empty() {
            warn!(%symbol, "No weekly data");
            return Ok(None);
        }

        let daily = self
            .source
            .fetch(symbol, Resolution::Daily, self.config.daily_count)
            .await?;
        if daily.is_empty() {
            warn!(%symbol, "No daily data");
            return Ok(None);
        }

        let Some(state) =
            classify_alignment(symbol, &weekly, &daily, self.config.sma_period, Utc::now())
        else {
            warn!(%symbol, period = self.config.sma_period, "SMA unavailable");
            return Ok(None);
        };

        self.store.write_pair_state(&state).await?;
        info!(
            %symbol,
            trend = %state.trend,
            weekly_price = state.weekly_price,
            weekly_sma = state.weekly_sma,
            daily_price = state.daily_price,
            daily_sma = state.daily_sma,
            "Pair classified"
        );
        Ok(Some(state))
    }

    // ─── Hourly H1 ────────────────────────────────────────────────────────────

    /// Run `detect_hourly_signal` for every aligned pair in `book` and append
    /// each signal to the log. Per-pair failures are logged and skipped.
    pub async fn scan_hourly(&self, book: &TrendBook) -> Vec<Signal> {
        let aligned: Vec<(String, Direction)> = book
            .aligned()
            .map(|(symbol, direction)| (symbol.to_string(), direction))
            .collect();
        if aligned.is_empty() {
            debug!("No aligned pairs to scan");
            return Vec::new();
        }

        info!(pairs = aligned.len(), "Hourly H1 scan starting");
        let mut signals = Vec::new();
        for (symbol, direction) in aligned {
            match self.detect_hourly_signal(&symbol, direction.into()).await {
                Ok(Some(signal)) => {
                    if let Err(e) = self.store.write_signal(&signal).await {
                        error!(%symbol, error = %e, "Failed to persist signal");
                    }
                    signals.push(signal);
                }
                Ok(None) => {}
                Err(e) => error!(%symbol, error = %e, "Hourly scan failed"),
            }
        }
        info!(signals = signals.len(), "Hourly H1 scan finished");
        signals
    }

    /// Hourly pass for one symbol. Emits at most one signal.
    ///
    /// Zone match and Heiken-Ashi color agreement are hard gates; RSI
    /// divergence and S/R confluence only annotate the signal. Zone
    /// bookkeeping failures are logged and never block the signal.
    pub async fn detect_hourly_signal(&self, symbol: &str, trend: Trend) -> Result<Option<Signal>> {
        let Some(direction) = trend.direction() else {
            debug!(%symbol, "Neutral trend, hourly scan skipped");
            return Ok(None);
        };

        let candles = self
            .source
            .fetch(symbol, Resolution::Hourly, self.config.hourly_count)
            .await?;
        if candles.is_empty() {
            warn!(%symbol, "No hourly data");
            return Ok(None);
        }

        // Always recomputed from the first candle of the fetched series.
        let ha = to_heiken_ashi(&candles);

        if let Some(latest) = ha.last() {
            if let Err(e) = self.invalidate_broken_zones(symbol, latest).await {
                warn!(%symbol, error = %e, "Zone review failed");
            }
        }

        let outcome = self.evaluate_hourly(symbol, direction, &candles, &ha, Utc::now());
        match outcome {
            HourlyOutcome::NoProjection => {
                debug!(%symbol, %direction, "No Fibonacci projection");
                Ok(None)
            }
            HourlyOutcome::OutsideZones { projections } => {
                debug!(%symbol, %direction, projections, "Price outside all zones");
                Ok(None)
            }
            HourlyOutcome::Unconfirmed { projection } => {
                debug!(%symbol, %direction, projection = projection.index, "Zone entered, awaiting Heiken-Ashi confirmation");
                if let Err(e) = self.track_zone(symbol, &projection, ZoneStatus::Active).await {
                    warn!(%symbol, error = %e, "Failed to track zone");
                }
                Ok(None)
            }
            HourlyOutcome::Confirmed { projection, signal } => {
                info!(
                    %symbol,
                    %direction,
                    price = signal.price,
                    projection = signal.projection_index,
                    rsi_divergence = signal.rsi_divergence,
                    sr_confluence = signal.sr_confluence,
                    "Signal detected"
                );
                if let Err(e) = self.track_zone(symbol, &projection, ZoneStatus::Confirmed).await {
                    warn!(%symbol, error = %e, "Failed to track zone");
                }
                Ok(Some(signal))
            }
        }
    }

    /// Pure hourly decision over an already fetched series.
    ///
    /// `ha` must be the Heiken-Ashi conversion of the full `candles` series.
    pub fn evaluate_hourly(
        &self,
        symbol: &str,
        direction: Direction,
        candles: &[Candle],
        ha: &[HeikenAshiCandle],
        detected_at: DateTime<Utc>,
    ) -> HourlyOutcome {
        let (Some(last), Some(last_ha)) = (candles.last(), ha.last()) else {
            return HourlyOutcome::NoProjection;
        };

        let projections = build_projections(
            candles,
            direction,
            self.config.swing_lookback,
            self.config.max_projections,
        );
        if projections.is_empty() {
            return HourlyOutcome::NoProjection;
        }

        let price = last.close;
        let Some(matched) = match_zone(price, &projections) else {
            return HourlyOutcome::OutsideZones {
                projections: projections.len(),
            };
        };

        let confirmed = match direction {
            Direction::Bullish => last_ha.is_bullish(),
            Direction::Bearish => last_ha.is_bearish(),
        };
        if !confirmed {
            return HourlyOutcome::Unconfirmed {
                projection: matched.clone(),
            };
        }

        let rsi_divergence = self.rsi.divergence(candles, direction);
        let levels = find_support_resistance(candles, self.config.sr_lookback);
        let sr_confluence = check_level_confluence(price, &levels, self.config.confluence_tolerance);

        let signal = Signal {
            symbol: symbol.to_string(),
            direction,
            price,
            projection_index: matched.index,
            projection_count: projections.len(),
            zone_min: matched.zone_min,
            zone_max: matched.zone_max,
            rsi_divergence,
            sr_confluence,
            confirmed: true,
            detected_at,
        };
        HourlyOutcome::Confirmed {
            projection: matched.clone(),
            signal,
        }
    }

    // ─── Zone lifecycle ───────────────────────────────────────────────────────

    async fn invalidate_broken_zones(&self, symbol: &str, latest: &HeikenAshiCandle) -> Result<()> {
        for zone in self.store.active_zones(symbol).await? {
            let Some(id) = zone.id else { continue };
            if is_body_outside_zone(latest, zone.zone_min(), zone.zone_max()) {
                self.store.set_zone_status(id, ZoneStatus::Invalidated).await?;
                info!(%symbol, zone_id = id, zone_min = zone.zone_min(), zone_max = zone.zone_max(), "Zone invalidated by body break");
            }
        }
        Ok(())
    }

    async fn track_zone(
        &self,
        symbol: &str,
        projection: &FibonacciProjection,
        status: ZoneStatus,
    ) -> Result<()> {
        let now = Utc::now();
        let zone = ActiveZone {
            id: None,
            symbol: symbol.to_string(),
            direction: projection.direction,
            high: projection.high(),
            low: projection.low(),
            level_500: projection.levels.get(FibLevel::L500),
            level_618: projection.levels.get(FibLevel::L618),
            status: ZoneStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let id = match self.store.find_zone(&zone).await? {
            Some(ActiveZone {
                id: Some(id),
                status: ZoneStatus::Active,
                ..
            }) => id,
            // Confirmed and invalidated zones are final.
            Some(settled) => {
                debug!(%symbol, zone_id = ?settled.id, status = %settled.status, "Zone already settled");
                return Ok(());
            }
            None => self.store.insert_zone(&zone).await?,
        };

        if status != ZoneStatus::Active {
            self.store.set_zone_status(id, status).await?;
        }
        Ok(())
    }
}

/// Weekly/daily alignment for one symbol from already fetched series.
/// `None` when either SMA is unavailable.
pub fn classify_alignment(
    symbol: &str,
    weekly: &[Candle],
    daily: &[Candle],
    sma_period: usize,
    now: DateTime<Utc>,
) -> Option<PairTrendState> {
    let weekly_sma = moving_average(weekly, sma_period)?;
    let daily_sma = moving_average(daily, sma_period)?;
    let weekly_price = weekly.last()?.close;
    let daily_price = daily.last()?.close;

    let weekly_trend = classify_trend(weekly_price, weekly_sma);
    let daily_trend = classify_trend(daily_price, daily_sma);
    let trend = if weekly_trend == daily_trend {
        weekly_trend
    } else {
        Trend::Neutral
    };
    if trend == Trend::Neutral {
        debug!(%symbol, %weekly_trend, %daily_trend, "Timeframes not aligned");
    }

    Some(PairTrendState {
        symbol: symbol.to_string(),
        trend,
        weekly_price,
        weekly_sma,
        daily_price,
        daily_sma,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn closes(values: &[f64]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: base + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect()
    }

    #[test]
    fn both_up_is_bullish() {
        let weekly = closes(&[1.0, 1.0, 1.3]);
        let daily = closes(&[1.1, 1.1, 1.2]);
        let state = classify_alignment("EUR/USD", &weekly, &daily, 3, Utc::now()).unwrap();
        assert_eq!(state.trend, Trend::Bullish);
        assert!((state.weekly_sma - 1.1).abs() < 1e-12);
        assert_eq!(state.daily_price, 1.2);
    }

    #[test]
    fn disagreement_is_neutral() {
        let weekly = closes(&[1.0, 1.0, 1.3]);
        let daily = closes(&[1.3, 1.3, 1.2]);
        let state = classify_alignment("EUR/USD", &weekly, &daily, 3, Utc::now()).unwrap();
        assert_eq!(state.trend, Trend::Neutral);
    }

    #[test]
    fn both_neutral_stays_neutral() {
        let weekly = closes(&[1.0, 1.0, 1.0]);
        let daily = closes(&[1.0, 1.0, 1.0]);
        let state = classify_alignment("EUR/USD", &weekly, &daily, 3, Utc::now()).unwrap();
        assert_eq!(state.trend, Trend::Neutral);
    }

    #[test]
    fn short_series_is_unavailable() {
        let weekly = closes(&[1.0, 1.1]);
        let daily = closes(&[1.0, 1.1, 1.2]);
        assert!(classify_alignment("EUR/USD", &weekly, &daily, 3, Utc::now()).is_none());
    }
}
