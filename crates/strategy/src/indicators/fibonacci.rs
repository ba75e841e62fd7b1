use common::{Candle, Direction};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::extrema::{local_extrema, ExtremumKind, SwingPoint};

/// Window used by `last_peak`/`last_trough` when the lookback holds no swing
/// point. Fixed, independent of the caller's lookback.
///
/// Series shorter than the window fall back over the whole series with
/// indices from 0. Offsetting by `len - 50` instead would go negative there
/// and yield no usable anchor; with the default `hourly_count` of 100 the
/// two never differ.
pub const FALLBACK_WINDOW: usize = 50;

/// Minimum series length for building projections.
pub const MIN_PROJECTION_CANDLES: usize = 10;

/// Retracement ratios, in level order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FibLevel {
    L0,
    L236,
    L382,
    L500,
    L618,
    L786,
    L100,
}

impl FibLevel {
    pub const ALL: [FibLevel; 7] = [
        FibLevel::L0,
        FibLevel::L236,
        FibLevel::L382,
        FibLevel::L500,
        FibLevel::L618,
        FibLevel::L786,
        FibLevel::L100,
    ];

    pub fn ratio(self) -> f64 {
        match self {
            FibLevel::L0 => 0.0,
            FibLevel::L236 => 0.236,
            FibLevel::L382 => 0.382,
            FibLevel::L500 => 0.5,
            FibLevel::L618 => 0.618,
            FibLevel::L786 => 0.786,
            FibLevel::L100 => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FibLevel::L0 => "level_0",
            FibLevel::L236 => "level_236",
            FibLevel::L382 => "level_382",
            FibLevel::L500 => "level_500",
            FibLevel::L618 => "level_618",
            FibLevel::L786 => "level_786",
            FibLevel::L100 => "level_100",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

/// Retracement prices between two anchors, ordered by ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibLevels {
    prices: [f64; 7],
}

impl FibLevels {
    pub fn get(&self, level: FibLevel) -> f64 {
        self.prices[level.position()]
    }

    /// `(level, price)` pairs in ratio order.
    pub fn iter(&self) -> impl Iterator<Item = (FibLevel, f64)> + '_ {
        FibLevel::ALL.iter().map(move |&l| (l, self.get(l)))
    }

    /// The action zone `[min(level_500, level_618), max(...)]`.
    /// Normalized so the direction of the anchors never inverts the interval.
    pub fn zone_bounds(&self) -> (f64, f64) {
        let a = self.get(FibLevel::L500);
        let b = self.get(FibLevel::L618);
        (a.min(b), a.max(b))
    }

    /// Inclusive test against the action zone.
    pub fn is_price_in_zone(&self, price: f64) -> bool {
        let (zone_min, zone_max) = self.zone_bounds();
        (zone_min..=zone_max).contains(&price)
    }
}

/// Retracement levels: `price = high − (high − low) × ratio`.
///
/// `level_0` is always `high` and `level_100` always `low`, whatever the trade
/// direction. Callers pass anchors in the order their direction requires.
pub fn levels(high: f64, low: f64) -> FibLevels {
    let diff = high - low;
    let mut prices = [0.0; 7];
    for level in FibLevel::ALL {
        prices[level.position()] = high - diff * level.ratio();
    }
    debug!(high, low, "Fibonacci levels computed");
    FibLevels { prices }
}

/// Swing peaks (on highs) and troughs (on lows) in the trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwingPoints {
    pub peaks: Vec<SwingPoint>,
    pub troughs: Vec<SwingPoint>,
}

/// Find swing points in the trailing `lookback` candles. Indices are absolute.
pub fn find_swing_points(candles: &[Candle], lookback: usize) -> SwingPoints {
    let points = SwingPoints {
        peaks: local_extrema(candles, lookback, ExtremumKind::Peak, |c| c.high),
        troughs: local_extrema(candles, lookback, ExtremumKind::Trough, |c| c.low),
    };
    debug!(
        peaks = points.peaks.len(),
        troughs = points.troughs.len(),
        "Swing points found"
    );
    points
}

/// Most recent swing peak, or the highest high of the last `FALLBACK_WINDOW`
/// candles when the lookback holds none. `None` only for an empty series.
pub fn last_peak(candles: &[Candle], lookback: usize) -> Option<SwingPoint> {
    find_swing_points(candles, lookback)
        .peaks
        .last()
        .copied()
        .or_else(|| fallback_extreme(candles, ExtremumKind::Peak))
}

/// Most recent swing trough, or the lowest low of the last `FALLBACK_WINDOW`
/// candles when the lookback holds none. `None` only for an empty series.
pub fn last_trough(candles: &[Candle], lookback: usize) -> Option<SwingPoint> {
    find_swing_points(candles, lookback)
        .troughs
        .last()
        .copied()
        .or_else(|| fallback_extreme(candles, ExtremumKind::Trough))
}

/// First occurrence of the extreme high/low in the fallback window.
fn fallback_extreme(candles: &[Candle], kind: ExtremumKind) -> Option<SwingPoint> {
    let start = candles.len().saturating_sub(FALLBACK_WINDOW);
    let window = &candles[start..];

    let value = |c: &Candle| match kind {
        ExtremumKind::Peak => c.high,
        ExtremumKind::Trough => c.low,
    };
    let better = |candidate: f64, best: f64| match kind {
        ExtremumKind::Peak => candidate > best,
        ExtremumKind::Trough => candidate < best,
    };

    let (offset, first) = window.iter().enumerate().next()?;
    let (best_offset, best_price) = window
        .iter()
        .enumerate()
        .skip(1)
        .fold((offset, value(first)), |(bi, bp), (i, c)| {
            if better(value(c), bp) {
                (i, value(c))
            } else {
                (bi, bp)
            }
        });

    debug!(?kind, index = start + best_offset, price = best_price, "Swing fallback used");
    Some(SwingPoint {
        index: start + best_offset,
        price: best_price,
        kind,
    })
}

/// One retracement drawn between the fixed anchor A and an earlier anchor B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciProjection {
    /// 1-based position in construction order.
    pub index: usize,
    pub direction: Direction,
    /// Most recent extreme: the peak for bullish, the trough for bearish.
    pub anchor_a: SwingPoint,
    /// Earlier opposite extreme: a trough for bullish, a peak for bearish.
    pub anchor_b: SwingPoint,
    pub levels: FibLevels,
    pub zone_min: f64,
    pub zone_max: f64,
}

impl FibonacciProjection {
    fn new(index: usize, direction: Direction, anchor_a: SwingPoint, anchor_b: SwingPoint) -> Self {
        let (high, low) = match direction {
            Direction::Bullish => (anchor_a.price, anchor_b.price),
            Direction::Bearish => (anchor_b.price, anchor_a.price),
        };
        let levels = levels(high, low);
        let (zone_min, zone_max) = levels.zone_bounds();
        Self {
            index,
            direction,
            anchor_a,
            anchor_b,
            levels,
            zone_min,
            zone_max,
        }
    }

    /// Price of the peak anchor.
    pub fn high(&self) -> f64 {
        self.levels.get(FibLevel::L0)
    }

    /// Price of the trough anchor.
    pub fn low(&self) -> f64 {
        self.levels.get(FibLevel::L100)
    }

    pub fn contains(&self, price: f64) -> bool {
        (self.zone_min..=self.zone_max).contains(&price)
    }
}

/// Build up to `max_count` projections in `direction`.
///
/// Bullish: anchor A is the last peak; every swing trough strictly before A
/// is a candidate and the last `max_count` of them (chronologically, i.e. the
/// ones nearest A) each give one projection. Bearish mirrors this with the
/// last trough and earlier peaks. Fewer than `MIN_PROJECTION_CANDLES`
/// candles yields no projections.
pub fn build_projections(
    candles: &[Candle],
    direction: Direction,
    lookback: usize,
    max_count: usize,
) -> Vec<FibonacciProjection> {
    if candles.len() < MIN_PROJECTION_CANDLES {
        warn!(candles = candles.len(), "Not enough candles for Fibonacci projections");
        return Vec::new();
    }

    let swings = find_swing_points(candles, lookback);
    let (anchor_a, candidates) = match direction {
        Direction::Bullish => (last_peak(candles, lookback), swings.troughs),
        Direction::Bearish => (last_trough(candles, lookback), swings.peaks),
    };
    let Some(anchor_a) = anchor_a else {
        return Vec::new();
    };

    let before: Vec<SwingPoint> = candidates
        .into_iter()
        .filter(|p| p.index < anchor_a.index)
        .collect();
    let selected = &before[before.len().saturating_sub(max_count)..];

    let projections: Vec<FibonacciProjection> = selected
        .iter()
        .enumerate()
        .map(|(i, &anchor_b)| FibonacciProjection::new(i + 1, direction, anchor_a, anchor_b))
        .collect();

    info!(
        %direction,
        count = projections.len(),
        anchor = anchor_a.price,
        "Fibonacci projections built"
    );
    projections
}

/// First projection, in construction order, whose zone contains `price`.
/// Ties resolve to the earliest match, not the closest zone.
pub fn match_zone(price: f64, projections: &[FibonacciProjection]) -> Option<&FibonacciProjection> {
    let matched = projections.iter().find(|p| p.contains(price));
    if let Some(p) = matched {
        info!(
            price,
            projection = p.index,
            zone_min = p.zone_min,
            zone_max = p.zone_max,
            "Price inside Fibonacci zone"
        );
    }
    matched
}
