use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use strategy::ScannerConfig;

use crate::scheduler::ScheduleConfig;

/// Twelve Data metering. Defaults match the free plan.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub requests_per_minute: u32,
    pub daily_credit_limit: u32,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 8,
            daily_credit_limit: 800,
        }
    }
}

/// Top-level bot config file (TOML).
///
/// Example `config/fibobot.toml`:
/// ```toml
/// [scanner]
/// pairs = ["EUR/USD", "USD/JPY"]
///
/// [schedule]
/// daily_scan_time = "00:00"
/// heartbeat_hours = 6
///
/// [market_data]
/// requests_per_minute = 8
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub scanner: ScannerConfig,
    pub schedule: ScheduleConfig,
    pub market_data: MarketDataConfig,
}

impl FileConfig {
    /// Load from a TOML file. A missing file yields defaults; an unreadable
    /// or invalid one exits the process.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Self::default();
        }
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read config at '{path}': {e}"));
        let cfg = Self::parse(&content)
            .unwrap_or_else(|e| panic!("Failed to parse config at '{path}': {e}"));
        info!(path, pairs = cfg.scanner.pairs.len(), "Config loaded");
        cfg
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
