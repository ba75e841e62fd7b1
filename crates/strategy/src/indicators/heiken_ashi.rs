use common::Candle;
use serde::Serialize;
use tracing::debug;

/// A raw candle with its Heiken-Ashi smoothed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeikenAshiCandle {
    pub candle: Candle,
    pub ha_open: f64,
    pub ha_high: f64,
    pub ha_low: f64,
    pub ha_close: f64,
}

impl HeikenAshiCandle {
    /// Green candle: `ha_close > ha_open`.
    pub fn is_bullish(&self) -> bool {
        self.ha_close > self.ha_open
    }

    /// Red candle: `ha_close < ha_open`. A doji is neither bullish nor bearish.
    pub fn is_bearish(&self) -> bool {
        self.ha_close < self.ha_open
    }

    /// Lower and upper edge of the body.
    pub fn body(&self) -> (f64, f64) {
        (self.ha_open.min(self.ha_close), self.ha_open.max(self.ha_close))
    }
}

/// Carry state of the Heiken-Ashi recurrence.
///
/// `ha_open[i]` depends on `ha_open[i-1]` and `ha_close[i-1]`, so every value
/// depends on the whole history. A fold must start at the earliest candle of
/// the series; folding from the middle of a window produces different opens.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeikenAshiFold {
    prev: Option<(f64, f64)>,
}

impl HeikenAshiFold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform the next raw candle and advance the carry.
    pub fn step(&mut self, candle: &Candle) -> HeikenAshiCandle {
        let ha_close = (candle.open + candle.high + candle.low + candle.close) / 4.0;
        let ha_open = match self.prev {
            Some((prev_open, prev_close)) => (prev_open + prev_close) / 2.0,
            // Seed: mean of the first candle's open and close.
            None => (candle.open + candle.close) / 2.0,
        };
        self.prev = Some((ha_open, ha_close));

        HeikenAshiCandle {
            candle: *candle,
            ha_open,
            ha_high: candle.high.max(ha_open).max(ha_close),
            ha_low: candle.low.min(ha_open).min(ha_close),
            ha_close,
        }
    }
}

/// Convert a full raw series to Heiken-Ashi. Output has the same length.
pub fn to_heiken_ashi(candles: &[Candle]) -> Vec<HeikenAshiCandle> {
    let mut fold = HeikenAshiFold::new();
    let ha: Vec<HeikenAshiCandle> = candles.iter().map(|c| fold.step(c)).collect();
    debug!(candles = ha.len(), "Heiken-Ashi conversion");
    ha
}

/// Color transition between two consecutive Heiken-Ashi candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChange {
    RedToGreen,
    GreenToRed,
    NoChange,
}

/// Classify the transition. Only "bullish or not" is compared, so a doji
/// counts as red here.
pub fn color_change(prev: &HeikenAshiCandle, curr: &HeikenAshiCandle) -> ColorChange {
    match (prev.is_bullish(), curr.is_bullish()) {
        (false, true) => ColorChange::RedToGreen,
        (true, false) => ColorChange::GreenToRed,
        _ => ColorChange::NoChange,
    }
}

/// A peak at `index` is confirmed when the candle there turns red → green.
pub fn is_peak_confirmed(candles: &[HeikenAshiCandle], index: usize) -> bool {
    transition_at(candles, index) == Some(ColorChange::RedToGreen)
}

/// A trough at `index` is confirmed when the candle there turns green → red.
pub fn is_trough_confirmed(candles: &[HeikenAshiCandle], index: usize) -> bool {
    transition_at(candles, index) == Some(ColorChange::GreenToRed)
}

fn transition_at(candles: &[HeikenAshiCandle], index: usize) -> Option<ColorChange> {
    if index < 1 || index >= candles.len() {
        return None;
    }
    Some(color_change(&candles[index - 1], &candles[index]))
}

/// Zone break test: the body lies entirely above `zone_max` or entirely
/// below `zone_min`. A wick poking through the zone does not count.
pub fn is_body_outside_zone(candle: &HeikenAshiCandle, zone_min: f64, zone_max: f64) -> bool {
    let (body_min, body_max) = candle.body();
    body_min > zone_max || body_max < zone_min
}
