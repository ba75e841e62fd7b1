use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar as delivered by the candle source.
/// Sequences are always ordered oldest first with no duplicate timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Forex series usually carry no volume; the source reports 0 then.
    pub volume: f64,
}

impl Candle {
    /// Basic OHLC sanity: `low <= open, close <= high`, all finite.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
    }
}

/// Market trend as classified against a moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    /// The tradeable direction of this trend, `None` for `Neutral`.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Trend::Bullish => Some(Direction::Bullish),
            Trend::Bearish => Some(Direction::Bearish),
            Trend::Neutral => None,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Direction of a signal or of a Fibonacci projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl From<Direction> for Trend {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => Trend::Bullish,
            Direction::Bearish => Trend::Bearish,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

/// Candle resolution requested from the candle source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Weekly,
    Daily,
    Hourly,
}

impl Resolution {
    /// Interval identifier understood by the market data provider.
    pub fn interval(self) -> &'static str {
        match self {
            Resolution::Weekly => "1week",
            Resolution::Daily => "1day",
            Resolution::Hourly => "1h",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.interval())
    }
}

/// Live weekly/daily classification of one symbol.
/// Overwritten wholesale on every daily pass; no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrendState {
    pub symbol: String,
    pub trend: Trend,
    pub weekly_price: f64,
    pub weekly_sma: f64,
    pub daily_price: f64,
    pub daily_sma: f64,
    pub updated_at: DateTime<Utc>,
}

impl PairTrendState {
    pub fn is_aligned(&self) -> bool {
        self.trend != Trend::Neutral
    }
}

/// A confirmed hourly entry signal. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    /// Latest hourly close that triggered the signal.
    pub price: f64,
    /// 1-based index of the matched projection, in construction order.
    pub projection_index: usize,
    /// How many projections were built on this pass.
    pub projection_count: usize,
    pub zone_min: f64,
    pub zone_max: f64,
    pub rsi_divergence: bool,
    pub sr_confluence: bool,
    /// Heiken-Ashi color agreed with the direction. Always true for an emitted signal.
    pub confirmed: bool,
    pub detected_at: DateTime<Utc>,
}

/// Lifecycle of a persisted action zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum ZoneStatus {
    /// Price entered the zone; waiting for Heiken-Ashi confirmation.
    Active,
    /// A signal was emitted from this zone.
    Confirmed,
    /// A Heiken-Ashi body closed fully outside the zone.
    Invalidated,
}

impl std::fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneStatus::Active => write!(f, "ACTIVE"),
            ZoneStatus::Confirmed => write!(f, "CONFIRMED"),
            ZoneStatus::Invalidated => write!(f, "INVALIDATED"),
        }
    }
}

/// Persisted record of a Fibonacci action zone that price has entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveZone {
    /// Store-assigned id; `None` until persisted.
    pub id: Option<i64>,
    pub symbol: String,
    pub direction: Direction,
    /// Price of the peak anchor.
    pub high: f64,
    /// Price of the trough anchor.
    pub low: f64,
    pub level_500: f64,
    pub level_618: f64,
    pub status: ZoneStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActiveZone {
    pub fn zone_min(&self) -> f64 {
        self.level_500.min(self.level_618)
    }

    pub fn zone_max(&self) -> f64 {
        self.level_500.max(self.level_618)
    }

    /// Two records describe the same zone when they share symbol, direction and anchors.
    pub fn same_zone(&self, other: &ActiveZone) -> bool {
        self.symbol == other.symbol
            && self.direction == other.direction
            && self.high == other.high
            && self.low == other.low
    }
}

/// Snapshot of market data API credit consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub used: u32,
    pub limit: u32,
}

impl ApiUsage {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}
