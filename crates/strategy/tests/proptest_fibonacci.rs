use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use common::{
    ActiveZone, Candle, CandleSource, Direction, PairTrendState, Resolution, Result, Signal,
    SignalStore, Trend, ZoneStatus,
};
use proptest::prelude::*;
use strategy::indicators::{
    build_projections, classify_trend, levels, match_zone, to_heiken_ashi, FibLevel,
};
use strategy::{HourlyOutcome, Scanner, ScannerConfig};

struct NoSource;

#[async_trait]
impl CandleSource for NoSource {
    async fn fetch(&self, _: &str, _: Resolution, _: usize) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }
}

struct NoStore;

#[async_trait]
impl SignalStore for NoStore {
    async fn write_pair_state(&self, _: &PairTrendState) -> Result<()> {
        Ok(())
    }
    async fn write_signal(&self, _: &Signal) -> Result<()> {
        Ok(())
    }
    async fn recent_signals(&self, _: Duration, _: Option<&str>) -> Result<Vec<Signal>> {
        Ok(Vec::new())
    }
    async fn pair_states(&self) -> Result<Vec<PairTrendState>> {
        Ok(Vec::new())
    }
    async fn active_zones(&self, _: &str) -> Result<Vec<ActiveZone>> {
        Ok(Vec::new())
    }
    async fn find_zone(&self, _: &ActiveZone) -> Result<Option<ActiveZone>> {
        Ok(None)
    }
    async fn insert_zone(&self, _: &ActiveZone) -> Result<i64> {
        Ok(1)
    }
    async fn set_zone_status(&self, _: i64, _: ZoneStatus) -> Result<()> {
        Ok(())
    }
}

/// Well-formed candles built from (mid, half range, open and close position in range).
fn candles_strategy(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(
        (0.5f64..2.0, 0.0001f64..0.05, 0.0f64..=1.0, 0.0f64..=1.0),
        len,
    )
    .prop_map(|bars| {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        bars.into_iter()
            .enumerate()
            .map(|(i, (mid, half, o, c))| {
                let low = mid - half;
                let high = mid + half;
                Candle {
                    timestamp: base + Duration::hours(i as i64),
                    open: low + (high - low) * o,
                    high,
                    low,
                    close: low + (high - low) * c,
                    volume: 0.0,
                }
            })
            .collect()
    })
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Bullish), Just(Direction::Bearish)]
}

proptest! {
    /// Level 0 is the high, level 100 the low, everything else strictly between.
    #[test]
    fn levels_are_bounded_by_anchors(low in 0.01f64..1000.0, gap in 0.001f64..100.0) {
        let high = low + gap;
        let l = levels(high, low);
        prop_assert_eq!(l.get(FibLevel::L0), high);
        prop_assert!((l.get(FibLevel::L100) - low).abs() < 1e-9);
        for level in [FibLevel::L236, FibLevel::L382, FibLevel::L500, FibLevel::L618, FibLevel::L786] {
            let price = l.get(level);
            prop_assert!(price > low && price < high, "{:?} = {} outside ({}, {})", level, price, low, high);
        }
    }

    #[test]
    fn price_equal_to_average_is_neutral(price in 0.0001f64..1_000_000.0) {
        prop_assert_eq!(classify_trend(price, price), Trend::Neutral);
    }

    /// Zones are normalized, projections are numbered 1..=n and capped.
    #[test]
    fn projections_are_well_formed(
        candles in candles_strategy(0..120),
        direction in direction_strategy(),
        max_count in 1usize..8,
    ) {
        let projections = build_projections(&candles, direction, 50, max_count);
        prop_assert!(projections.len() <= max_count);
        for (i, p) in projections.iter().enumerate() {
            prop_assert_eq!(p.index, i + 1);
            prop_assert!(p.zone_min <= p.zone_max);
            prop_assert!(p.anchor_b.index < p.anchor_a.index);
        }
    }

    /// The matched zone contains the price and no earlier zone does.
    #[test]
    fn match_zone_returns_first_containing(
        candles in candles_strategy(10..120),
        direction in direction_strategy(),
        price in 0.4f64..2.1,
    ) {
        let projections = build_projections(&candles, direction, 50, 4);
        match match_zone(price, &projections) {
            Some(p) => {
                prop_assert!(p.contains(price));
                prop_assert!(projections[..p.index - 1].iter().all(|q| !q.contains(price)));
            }
            None => prop_assert!(projections.iter().all(|q| !q.contains(price))),
        }
    }

    #[test]
    fn heiken_ashi_is_deterministic_and_bounded(candles in candles_strategy(0..80)) {
        let first = to_heiken_ashi(&candles);
        let second = to_heiken_ashi(&candles);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), candles.len());
        for ha in &first {
            prop_assert!(ha.ha_high >= ha.ha_open.max(ha.ha_close));
            prop_assert!(ha.ha_low <= ha.ha_open.min(ha.ha_close));
        }
    }

    /// A confirmed outcome always agrees with the latest Heiken-Ashi color.
    #[test]
    fn signal_requires_matching_color(
        candles in candles_strategy(10..120),
        direction in direction_strategy(),
    ) {
        let scanner = Scanner::new(Arc::new(NoSource), Arc::new(NoStore), ScannerConfig::default());
        let ha = to_heiken_ashi(&candles);
        let outcome = scanner.evaluate_hourly("EUR/USD", direction, &candles, &ha, Utc::now());
        if let HourlyOutcome::Confirmed { signal, projection } = outcome {
            let last = ha.last().unwrap();
            match direction {
                Direction::Bullish => prop_assert!(last.is_bullish()),
                Direction::Bearish => prop_assert!(last.is_bearish()),
            }
            prop_assert!(projection.contains(signal.price));
            prop_assert!(signal.projection_index <= signal.projection_count);
        }
    }
}

#[test]
fn windowed_recompute_differs_from_full_history() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles: Vec<Candle> = [
        (1.00, 1.05, 0.98, 1.04),
        (1.04, 1.10, 1.03, 1.09),
        (1.09, 1.12, 1.01, 1.02),
        (1.02, 1.06, 1.00, 1.05),
    ]
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
    .collect();

    let full = to_heiken_ashi(&candles);
    let window = to_heiken_ashi(&candles[2..]);
    assert_ne!(full[2].ha_open, window[0].ha_open);
    // Closes depend only on the raw candle.
    assert_eq!(full[3].ha_close, window[1].ha_close);
}
