use async_trait::async_trait;

use crate::{ApiUsage, Candle, Resolution, Result};

/// Abstraction over the market data provider.
///
/// `TwelveDataClient` implements this for live data. Tests use in-memory
/// fakes. Implementations own all blocking concerns (network, rate limits,
/// backoff); the scanner never retries.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch up to `count` candles, oldest first, contiguous, with no
    /// future timestamps. An empty vector means the series is unavailable.
    async fn fetch(&self, symbol: &str, resolution: Resolution, count: usize)
        -> Result<Vec<Candle>>;

    /// API credit consumption, if the provider meters requests.
    async fn usage(&self) -> Option<ApiUsage> {
        None
    }
}
