use async_trait::async_trait;
use chrono::Duration;

use crate::{ActiveZone, PairTrendState, Result, Signal, ZoneStatus};

/// Persistence for pair classifications, the signal log and tracked zones.
///
/// The scanner only writes through this trait. Reads serve the operator
/// bot, the reporting API and the zone lifecycle review.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Insert or wholesale-replace the live record for `state.symbol`.
    async fn write_pair_state(&self, state: &PairTrendState) -> Result<()>;

    /// Append a signal to the log.
    async fn write_signal(&self, signal: &Signal) -> Result<()>;

    /// Signals detected within `window` of now, newest first.
    async fn recent_signals(&self, window: Duration, symbol: Option<&str>)
        -> Result<Vec<Signal>>;

    /// All live pair records, ordered by symbol.
    async fn pair_states(&self) -> Result<Vec<PairTrendState>>;

    /// Zones for `symbol` still in `ZoneStatus::Active`.
    async fn active_zones(&self, symbol: &str) -> Result<Vec<ActiveZone>>;

    /// Latest record with the same symbol, direction and anchors as `zone`,
    /// whatever its status.
    async fn find_zone(&self, zone: &ActiveZone) -> Result<Option<ActiveZone>>;

    /// Persist a newly entered zone and return its id.
    async fn insert_zone(&self, zone: &ActiveZone) -> Result<i64>;

    async fn set_zone_status(&self, id: i64, status: ZoneStatus) -> Result<()>;
}
