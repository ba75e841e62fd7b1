use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::{ApiUsage, Candle, CandleSource, Error, Resolution, Result};

use super::limiter::RateLimiter;

const BASE_URL: &str = "https://api.twelvedata.com";
const MAX_OUTPUT_SIZE: usize = 5000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the Twelve Data `time_series` endpoint.
///
/// Every request takes one credit from the shared `RateLimiter` first.
pub struct TwelveDataClient {
    api_key: String,
    base_url: String,
    http: Client,
    limiter: RateLimiter,
}

impl TwelveDataClient {
    pub fn new(api_key: impl Into<String>, limiter: RateLimiter) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            http,
            limiter,
        })
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn time_series(&self, symbol: &str, resolution: Resolution, count: usize) -> Result<String> {
        let context = format!("{symbol} {resolution}");
        self.limiter.acquire(&context).await?;

        let outputsize = count.min(MAX_OUTPUT_SIZE).to_string();
        let url = format!("{}/time_series", self.base_url);
        debug!(%symbol, interval = resolution.interval(), %outputsize, "Requesting time series");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", resolution.interval()),
                ("outputsize", outputsize.as_str()),
                ("order", "ASC"),
                ("format", "JSON"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Http(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl CandleSource for TwelveDataClient {
    async fn fetch(&self, symbol: &str, resolution: Resolution, count: usize) -> Result<Vec<Candle>> {
        let body = self.time_series(symbol, resolution, count).await?;
        let candles = parse_time_series(&body, Utc::now())
            .map_err(|e| Error::MarketData(format!("{symbol} {resolution}: {e}")))?;
        debug!(%symbol, %resolution, candles = candles.len(), "Time series received");
        Ok(candles)
    }

    async fn usage(&self) -> Option<ApiUsage> {
        Some(self.limiter.usage().await)
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    values: Vec<RawBar>,
}

#[derive(Deserialize)]
struct RawBar {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl RawBar {
    fn to_candle(&self) -> Result<Candle> {
        let candle = Candle {
            timestamp: parse_datetime(&self.datetime)?,
            open: parse_price("open", &self.open)?,
            high: parse_price("high", &self.high)?,
            low: parse_price("low", &self.low)?,
            close: parse_price("close", &self.close)?,
            volume: match &self.volume {
                Some(v) => parse_price("volume", v)?,
                None => 0.0,
            },
        };
        if !candle.is_well_formed() {
            return Err(Error::MarketData(format!(
                "inconsistent OHLC at {}",
                self.datetime
            )));
        }
        Ok(candle)
    }
}

/// Decode a `time_series` body into validated candles, oldest first.
///
/// A provider error status or any malformed row fails the whole series.
/// Rows stamped after `now` are dropped; duplicate timestamps keep the
/// first occurrence.
pub fn parse_time_series(body: &str, now: DateTime<Utc>) -> Result<Vec<Candle>> {
    let resp: TimeSeriesResponse = serde_json::from_str(body)?;
    if resp.status != "ok" {
        return Err(Error::MarketData(
            resp.message.unwrap_or_else(|| format!("status '{}'", resp.status)),
        ));
    }

    let mut candles = resp
        .values
        .iter()
        .map(RawBar::to_candle)
        .collect::<Result<Vec<_>>>()?;

    let before = candles.len();
    candles.retain(|c| c.timestamp <= now);
    if candles.len() < before {
        warn!(dropped = before - candles.len(), "Dropped candles stamped in the future");
    }
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::MarketData(format!("bad datetime '{raw}'")))
}

fn parse_price(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::MarketData(format!("bad {field} '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    const HOURLY: &str = r#"{
        "meta": {"symbol": "EUR/USD", "interval": "1h"},
        "values": [
            {"datetime": "2024-06-03 10:00:00", "open": "1.0850", "high": "1.0870", "low": "1.0840", "close": "1.0860"},
            {"datetime": "2024-06-03 09:00:00", "open": "1.0830", "high": "1.0855", "low": "1.0825", "close": "1.0850"},
            {"datetime": "2024-06-03 10:00:00", "open": "1.0850", "high": "1.0870", "low": "1.0840", "close": "1.0860"}
        ],
        "status": "ok"
    }"#;

    #[test]
    fn rows_are_sorted_and_deduplicated() {
        let candles = parse_time_series(HOURLY, now()).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert_eq!(candles[1].close, 1.0860);
        assert_eq!(candles[0].volume, 0.0);
    }

    #[test]
    fn daily_dates_parse_as_midnight() {
        let body = r#"{"values": [{"datetime": "2024-05-31", "open": "1.08", "high": "1.09", "low": "1.07", "close": "1.085", "volume": "0"}], "status": "ok"}"#;
        let candles = parse_time_series(body, now()).unwrap();
        assert_eq!(candles[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn error_status_carries_provider_message() {
        let body = r#"{"code": 400, "message": "**symbol** not found: FOO/BAR", "status": "error"}"#;
        match parse_time_series(body, now()) {
            Err(Error::MarketData(msg)) => assert!(msg.contains("FOO/BAR")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_row_fails_the_series() {
        let body = r#"{"values": [{"datetime": "2024-06-03 10:00:00", "open": "x", "high": "1.09", "low": "1.07", "close": "1.08"}], "status": "ok"}"#;
        assert!(matches!(parse_time_series(body, now()), Err(Error::MarketData(_))));

        let inverted = r#"{"values": [{"datetime": "2024-06-03 10:00:00", "open": "1.08", "high": "1.07", "low": "1.09", "close": "1.08"}], "status": "ok"}"#;
        assert!(matches!(parse_time_series(inverted, now()), Err(Error::MarketData(_))));
    }

    #[test]
    fn future_rows_are_dropped() {
        let body = r#"{"values": [
            {"datetime": "2024-06-03 11:00:00", "open": "1.08", "high": "1.09", "low": "1.07", "close": "1.08"},
            {"datetime": "2024-06-03 13:00:00", "open": "1.08", "high": "1.09", "low": "1.07", "close": "1.08"}
        ], "status": "ok"}"#;
        assert_eq!(parse_time_series(body, now()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_sends_query_and_meters_credits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/time_series")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "EUR/USD".into()),
                Matcher::UrlEncoded("interval".into(), "1day".into()),
                Matcher::UrlEncoded("outputsize".into(), "5000".into()),
                Matcher::UrlEncoded("order".into(), "ASC".into()),
                Matcher::UrlEncoded("apikey".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"values": [{"datetime": "2024-05-31", "open": "1.08", "high": "1.09", "low": "1.07", "close": "1.085"}], "status": "ok"}"#)
            .create_async()
            .await;

        let client = TwelveDataClient::new("test-key", RateLimiter::new(8, 800))
            .unwrap()
            .with_base_url(server.url());
        let candles = client.fetch("EUR/USD", Resolution::Daily, 9000).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 1);
        assert_eq!(client.usage().await, Some(ApiUsage { used: 1, limit: 800 }));
    }

    #[tokio::test]
    async fn http_failure_is_an_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/time_series")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let client = TwelveDataClient::new("k", RateLimiter::new(8, 800))
            .unwrap()
            .with_base_url(server.url());
        let err = client.fetch("EUR/USD", Resolution::Hourly, 100).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
