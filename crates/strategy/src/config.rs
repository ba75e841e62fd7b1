use serde::{Deserialize, Serialize};

use crate::indicators::technical::DEFAULT_CONFLUENCE_TOLERANCE;

/// Scanner parameters, read from the `[scanner]` table of the bot config.
///
/// Every field has a default, so an empty table is valid:
/// ```toml
/// [scanner]
/// pairs = ["EUR/USD", "GBP/USD"]
/// sma_period = 200
/// max_projections = 4
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Symbols in the provider's notation, e.g. "EUR/USD".
    pub pairs: Vec<String>,
    /// Moving average period for the weekly and daily trend.
    pub sma_period: usize,
    pub rsi_period: usize,
    /// Upper bound on Fibonacci projections per hourly pass.
    pub max_projections: usize,
    /// Trailing window for swing point detection.
    pub swing_lookback: usize,
    /// Trailing window for support/resistance extraction.
    pub sr_lookback: usize,
    /// Confluence tolerance as a fraction of price.
    pub confluence_tolerance: f64,
    pub weekly_count: usize,
    pub daily_count: usize,
    pub hourly_count: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            pairs: DEFAULT_PAIRS.iter().map(|s| s.to_string()).collect(),
            sma_period: 200,
            rsi_period: 14,
            max_projections: 4,
            swing_lookback: 50,
            sr_lookback: 50,
            confluence_tolerance: DEFAULT_CONFLUENCE_TOLERANCE,
            weekly_count: 200,
            daily_count: 200,
            hourly_count: 100,
        }
    }
}

pub const DEFAULT_PAIRS: [&str; 14] = [
    "EUR/USD", "GBP/USD", "USD/JPY", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD", "EUR/GBP",
    "EUR/JPY", "GBP/JPY", "AUD/JPY", "EUR/CHF", "GBP/CHF", "CAD/JPY",
];
