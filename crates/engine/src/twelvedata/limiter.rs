use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use common::{ApiUsage, Error, Result};

const WINDOW_SECS: i64 = 60;

fn window() -> chrono::Duration {
    chrono::Duration::seconds(WINDOW_SECS)
}

/// Outcome of asking the ledger for one request credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    /// Minute window is full; retry after this long.
    Wait(Duration),
    /// Daily credits are spent until the next UTC midnight.
    Exhausted,
}

/// Request accounting for a metered API: a per-minute window that opens on
/// the first request after the previous one expired, plus a daily credit
/// budget that resets at UTC midnight. Pure; the clock is passed in.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    per_minute: u32,
    daily_limit: u32,
    window_start: DateTime<Utc>,
    window_used: u32,
    day: NaiveDate,
    day_used: u32,
}

impl CreditLedger {
    pub fn new(per_minute: u32, daily_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            per_minute: per_minute.max(1),
            daily_limit,
            window_start: now,
            window_used: 0,
            day: now.date_naive(),
            day_used: 0,
        }
    }

    pub fn admit(&mut self, now: DateTime<Utc>) -> Admission {
        if now.date_naive() != self.day {
            self.day = now.date_naive();
            self.day_used = 0;
        }
        if now - self.window_start >= window() {
            self.window_start = now;
            self.window_used = 0;
        }

        if self.day_used >= self.daily_limit {
            return Admission::Exhausted;
        }
        if self.window_used >= self.per_minute {
            let remaining = (self.window_start + window() - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            // Land just past the window edge.
            return Admission::Wait(remaining + Duration::from_millis(100));
        }

        self.window_used += 1;
        self.day_used += 1;
        Admission::Granted
    }

    /// Credits consumed today as of `now`.
    pub fn usage(&self, now: DateTime<Utc>) -> ApiUsage {
        let used = if now.date_naive() == self.day {
            self.day_used
        } else {
            0
        };
        ApiUsage {
            used,
            limit: self.daily_limit,
        }
    }
}

/// Shared async front of a `CreditLedger`.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<CreditLedger>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32, daily_limit: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CreditLedger::new(
                per_minute,
                daily_limit,
                Utc::now(),
            ))),
        }
    }

    /// Take one credit, sleeping while the minute window is full.
    /// Fails fast once the daily budget is gone.
    pub async fn acquire(&self, context: &str) -> Result<()> {
        loop {
            let wait = {
                let mut guard = self.inner.lock().await;
                match guard.admit(Utc::now()) {
                    Admission::Granted => return Ok(()),
                    Admission::Exhausted => {
                        let usage = guard.usage(Utc::now());
                        return Err(Error::MarketData(format!(
                            "daily API credits exhausted ({}/{})",
                            usage.used, usage.limit
                        )));
                    }
                    Admission::Wait(wait) => wait,
                }
            };

            warn!(
                context,
                wait_secs = wait.as_secs_f64(),
                "Rate limit reached, waiting for the next window"
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn usage(&self) -> ApiUsage {
        self.inner.lock().await.usage(Utc::now())
    }
}
