use async_trait::async_trait;

use crate::{ApiUsage, PairTrendState, Result, Signal};

/// Outbound delivery of scanner results to the operator.
///
/// Detection never depends on delivery: callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_signal(&self, signal: &Signal) -> Result<()>;

    /// Summary of a completed daily classification pass.
    async fn notify_daily_summary(&self, states: &[PairTrendState]) -> Result<()>;

    async fn notify_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()>;
}

/// Liveness report sent on the heartbeat schedule.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    pub uptime: chrono::Duration,
    pub aligned_pairs: usize,
    pub usage: Option<ApiUsage>,
}
