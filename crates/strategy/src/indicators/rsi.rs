use common::{Candle, Direction};
use tracing::debug;

/// Number of trailing samples compared when looking for divergence.
const DIVERGENCE_SAMPLES: usize = 10;

/// RSI (Relative Strength Index) momentum oscillator.
///
/// Plain averages of gains and losses over the trailing `period` close-to-close
/// changes (no Wilder smoothing). Returns `None` until at least `period + 1`
/// closes are available.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl Default for RsiIndicator {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl RsiIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }

    /// Compute RSI from a slice of close prices (oldest first).
    ///
    /// A zero average loss gives 100 when there was any gain and 0 on a flat
    /// series, rather than `None`.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        if closes.len() < self.period + 1 {
            return None;
        }

        let tail = &closes[closes.len() - self.period - 1..];
        let changes = tail.windows(2).map(|w| w[1] - w[0]);

        let (gain_sum, loss_sum) = changes.fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });
        let avg_gain = gain_sum / self.period as f64;
        let avg_loss = loss_sum / self.period as f64;

        let rsi = if avg_loss == 0.0 {
            if avg_gain > 0.0 {
                100.0
            } else {
                0.0
            }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        debug!(period = self.period, rsi, "RSI computed");
        Some(rsi)
    }

    pub fn compute_candles(&self, candles: &[Candle]) -> Option<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        self.compute(&closes)
    }

    /// Detect price/momentum divergence on the most recent candle.
    ///
    /// RSI is sampled on the ten trailing windows ending at each of the last
    /// ten candles. Bullish: the last low undercuts the previous low while RSI
    /// rises. Bearish: the last high exceeds the previous high while RSI falls.
    /// Needs `period + 10` candles, otherwise reports no divergence.
    pub fn divergence(&self, candles: &[Candle], direction: Direction) -> bool {
        if candles.len() < self.period + DIVERGENCE_SAMPLES {
            return false;
        }

        let len = candles.len();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let samples: Vec<f64> = (0..DIVERGENCE_SAMPLES)
            .filter_map(|k| self.compute(&closes[..len - (DIVERGENCE_SAMPLES - 1) + k]))
            .collect();

        let &[.., prev_rsi, last_rsi] = samples.as_slice() else {
            return false;
        };
        let prev = &candles[len - 2];
        let last = &candles[len - 1];

        let found = match direction {
            Direction::Bullish => last.low < prev.low && last_rsi > prev_rsi,
            Direction::Bearish => last.high > prev.high && last_rsi < prev_rsi,
        };
        if found {
            debug!(%direction, prev_rsi, last_rsi, "RSI divergence detected");
        }
        found
    }
}
