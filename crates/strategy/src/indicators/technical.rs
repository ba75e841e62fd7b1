use common::{Candle, Trend};
use serde::Serialize;
use tracing::debug;

use super::extrema::{local_extrema, ExtremumKind};

/// Default tolerance for level confluence, as a fraction of price (0.1%).
pub const DEFAULT_CONFLUENCE_TOLERANCE: f64 = 0.001;

/// Simple moving average of the last `period` closes.
/// Returns `None` if there are fewer than `period` candles; never extrapolates.
pub fn moving_average(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let sum: f64 = candles[candles.len() - period..].iter().map(|c| c.close).sum();
    let sma = sum / period as f64;
    debug!(period, sma, "SMA computed");
    Some(sma)
}

/// Classify price against its moving average.
///
/// Exact equality is `Neutral`. This is a deliberate boundary: a price
/// sitting on its average carries no directional information.
pub fn classify_trend(price: f64, average: f64) -> Trend {
    if price > average {
        Trend::Bullish
    } else if price < average {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// Horizontal levels from recent local highs and lows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    /// Distinct local lows, ascending.
    pub supports: Vec<f64>,
    /// Distinct local highs, descending.
    pub resistances: Vec<f64>,
}

impl SupportResistance {
    pub fn is_empty(&self) -> bool {
        self.supports.is_empty() && self.resistances.is_empty()
    }
}

/// Extract support/resistance from the trailing `lookback` candles.
/// Needs at least `lookback` candles, otherwise both lists are empty.
pub fn find_support_resistance(candles: &[Candle], lookback: usize) -> SupportResistance {
    if candles.len() < lookback {
        return SupportResistance::default();
    }

    let mut resistances: Vec<f64> = local_extrema(candles, lookback, ExtremumKind::Peak, |c| c.high)
        .into_iter()
        .map(|p| p.price)
        .collect();
    let mut supports: Vec<f64> = local_extrema(candles, lookback, ExtremumKind::Trough, |c| c.low)
        .into_iter()
        .map(|p| p.price)
        .collect();

    resistances.sort_by(|a, b| b.total_cmp(a));
    resistances.dedup();
    supports.sort_by(|a, b| a.total_cmp(b));
    supports.dedup();

    debug!(
        supports = supports.len(),
        resistances = resistances.len(),
        "Support/resistance levels found"
    );
    SupportResistance {
        supports,
        resistances,
    }
}

/// True if `price` is within `price * tolerance_pct` of any support or resistance.
pub fn check_level_confluence(price: f64, levels: &SupportResistance, tolerance_pct: f64) -> bool {
    let tolerance = price * tolerance_pct;
    levels
        .supports
        .iter()
        .chain(levels.resistances.iter())
        .any(|level| (price - level).abs() <= tolerance)
}
