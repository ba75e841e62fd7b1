use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use common::{
    ActiveZone, Direction, PairTrendState, Result, Signal, SignalStore, Trend, ZoneStatus,
};

/// `SignalStore` backed by SQLite. Timestamps are RFC 3339 UTC text with
/// second precision, so text order equals time order.
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Open the pool and apply pending migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        // Each connection to `:memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self::new(db);
        store.migrate().await?;
        Ok(store)
    }

    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.db)
            .await
            .map_err(sqlx::Error::from)?;
        info!("Database migrations applied");
        Ok(())
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn get_ts(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn signal_from_row(row: &SqliteRow) -> Result<Signal, sqlx::Error> {
    Ok(Signal {
        symbol: row.try_get("symbol")?,
        direction: row.try_get::<Direction, _>("direction")?,
        price: row.try_get("price")?,
        projection_index: row.try_get::<i64, _>("projection_index")? as usize,
        projection_count: row.try_get::<i64, _>("projection_count")? as usize,
        zone_min: row.try_get("zone_min")?,
        zone_max: row.try_get("zone_max")?,
        rsi_divergence: row.try_get("rsi_divergence")?,
        sr_confluence: row.try_get("sr_confluence")?,
        confirmed: row.try_get("confirmed")?,
        detected_at: get_ts(row, "detected_at")?,
    })
}

fn pair_from_row(row: &SqliteRow) -> Result<PairTrendState, sqlx::Error> {
    Ok(PairTrendState {
        symbol: row.try_get("symbol")?,
        trend: row.try_get::<Trend, _>("trend")?,
        weekly_price: row.try_get("weekly_price")?,
        weekly_sma: row.try_get("weekly_sma")?,
        daily_price: row.try_get("daily_price")?,
        daily_sma: row.try_get("daily_sma")?,
        updated_at: get_ts(row, "updated_at")?,
    })
}

fn zone_from_row(row: &SqliteRow) -> Result<ActiveZone, sqlx::Error> {
    Ok(ActiveZone {
        id: Some(row.try_get("id")?),
        symbol: row.try_get("symbol")?,
        direction: row.try_get::<Direction, _>("direction")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        level_500: row.try_get("level_500")?,
        level_618: row.try_get("level_618")?,
        status: row.try_get::<ZoneStatus, _>("status")?,
        created_at: get_ts(row, "created_at")?,
        updated_at: get_ts(row, "updated_at")?,
    })
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn write_pair_state(&self, state: &PairTrendState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pair_status (symbol, trend, weekly_price, weekly_sma, daily_price, daily_sma, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(symbol) DO UPDATE SET
                trend = excluded.trend,
                weekly_price = excluded.weekly_price,
                weekly_sma = excluded.weekly_sma,
                daily_price = excluded.daily_price,
                daily_sma = excluded.daily_sma,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.symbol)
        .bind(state.trend)
        .bind(state.weekly_price)
        .bind(state.weekly_sma)
        .bind(state.daily_price)
        .bind(state.daily_sma)
        .bind(ts(state.updated_at))
        .execute(&self.db)
        .await?;

        debug!(symbol = %state.symbol, trend = %state.trend, "Pair status stored");
        Ok(())
    }

    async fn write_signal(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (
                symbol, direction, price, projection_index, projection_count,
                zone_min, zone_max, rsi_divergence, sr_confluence, confirmed, detected_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&signal.symbol)
        .bind(signal.direction)
        .bind(signal.price)
        .bind(signal.projection_index as i64)
        .bind(signal.projection_count as i64)
        .bind(signal.zone_min)
        .bind(signal.zone_max)
        .bind(signal.rsi_divergence)
        .bind(signal.sr_confluence)
        .bind(signal.confirmed)
        .bind(ts(signal.detected_at))
        .execute(&self.db)
        .await?;

        debug!(symbol = %signal.symbol, direction = %signal.direction, "Signal stored");
        Ok(())
    }

    async fn recent_signals(&self, window: Duration, symbol: Option<&str>) -> Result<Vec<Signal>> {
        let cutoff = ts(Utc::now() - window);
        let rows = match symbol {
            Some(symbol) => {
                sqlx::query(
                    "SELECT * FROM signals WHERE detected_at >= ?1 AND symbol = ?2
                     ORDER BY detected_at DESC, id DESC",
                )
                .bind(cutoff)
                .bind(symbol)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM signals WHERE detected_at >= ?1
                     ORDER BY detected_at DESC, id DESC",
                )
                .bind(cutoff)
                .fetch_all(&self.db)
                .await?
            }
        };

        let signals = rows
            .iter()
            .map(signal_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(signals)
    }

    async fn pair_states(&self) -> Result<Vec<PairTrendState>> {
        let rows = sqlx::query("SELECT * FROM pair_status ORDER BY symbol")
            .fetch_all(&self.db)
            .await?;
        let states = rows
            .iter()
            .map(pair_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    async fn active_zones(&self, symbol: &str) -> Result<Vec<ActiveZone>> {
        let rows = sqlx::query(
            "SELECT * FROM active_zones WHERE symbol = ?1 AND status = ?2 ORDER BY id",
        )
        .bind(symbol)
        .bind(ZoneStatus::Active)
        .fetch_all(&self.db)
        .await?;
        let zones = rows
            .iter()
            .map(zone_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    async fn find_zone(&self, zone: &ActiveZone) -> Result<Option<ActiveZone>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM active_zones
            WHERE symbol = ?1 AND direction = ?2 AND high = ?3 AND low = ?4
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(&zone.symbol)
        .bind(zone.direction)
        .bind(zone.high)
        .bind(zone.low)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.as_ref().map(zone_from_row).transpose()?)
    }

    async fn insert_zone(&self, zone: &ActiveZone) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO active_zones (
                symbol, direction, high, low, level_500, level_618, status, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&zone.symbol)
        .bind(zone.direction)
        .bind(zone.high)
        .bind(zone.low)
        .bind(zone.level_500)
        .bind(zone.level_618)
        .bind(zone.status)
        .bind(ts(zone.created_at))
        .bind(ts(zone.updated_at))
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        info!(symbol = %zone.symbol, zone_id = id, zone_min = zone.zone_min(), zone_max = zone.zone_max(), "Zone tracked");
        Ok(id)
    }

    async fn set_zone_status(&self, id: i64, status: ZoneStatus) -> Result<()> {
        sqlx::query("UPDATE active_zones SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(&self.db)
            .await?;
        debug!(zone_id = id, %status, "Zone status updated");
        Ok(())
    }
}
