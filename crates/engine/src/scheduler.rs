use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use common::{Error, Result};
use strategy::TrendBook;

use crate::jobs::Jobs;

/// `[schedule]` table of the bot config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// UTC wall-clock time of the daily W1+D1 pass, `"HH:MM"` or `"HH"`.
    pub daily_scan_time: String,
    /// Heartbeat interval; 0 disables heartbeats.
    pub heartbeat_hours: u64,
    /// Run a classification pass immediately on startup instead of waiting
    /// for the first daily slot.
    pub scan_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_scan_time: "00:00".to_string(),
            heartbeat_hours: 6,
            scan_on_startup: true,
        }
    }
}

pub fn parse_daily_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    let mut parts = raw.splitn(2, ':');
    let hour = parts.next().and_then(|h| h.parse::<u32>().ok());
    let minute = match parts.next() {
        Some(m) => m.parse::<u32>().ok(),
        None => Some(0),
    };
    hour.zip(minute)
        .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        .ok_or_else(|| Error::Config(format!("invalid daily_scan_time '{raw}'")))
}

/// First occurrence of `at` (UTC) strictly after `after`.
pub fn next_daily_run(after: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let candidate = after.date_naive().and_time(at).and_utc();
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Top of the next hour strictly after `after`.
pub fn next_hourly_run(after: DateTime<Utc>) -> DateTime<Utc> {
    let next = (after.timestamp().div_euclid(3600) + 1) * 3600;
    DateTime::from_timestamp(next, 0).unwrap_or(after + Duration::hours(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Daily,
    Hourly,
    Heartbeat,
}

/// Next due time of every job. Pure; the clock is passed in.
#[derive(Debug, Clone)]
pub struct Timetable {
    daily_at: NaiveTime,
    heartbeat_every: Option<Duration>,
    next_daily: DateTime<Utc>,
    next_hourly: DateTime<Utc>,
    next_heartbeat: Option<DateTime<Utc>>,
}

impl Timetable {
    pub fn new(config: &ScheduleConfig, now: DateTime<Utc>) -> Result<Self> {
        let daily_at = parse_daily_time(&config.daily_scan_time)?;
        let heartbeat_every = (config.heartbeat_hours > 0)
            .then(|| Duration::hours(config.heartbeat_hours as i64));
        Ok(Self {
            daily_at,
            heartbeat_every,
            next_daily: next_daily_run(now, daily_at),
            next_hourly: next_hourly_run(now),
            next_heartbeat: heartbeat_every.map(|every| now + every),
        })
    }

    pub fn next_wakeup(&self) -> DateTime<Utc> {
        let mut wake = self.next_daily.min(self.next_hourly);
        if let Some(hb) = self.next_heartbeat {
            wake = wake.min(hb);
        }
        wake
    }

    /// Jobs due at `now`, daily first, and advance each to its next slot.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<Job> {
        let mut jobs = Vec::new();
        if self.next_daily <= now {
            jobs.push(Job::Daily);
            self.next_daily = next_daily_run(now, self.daily_at);
        }
        if self.next_hourly <= now {
            jobs.push(Job::Hourly);
            self.next_hourly = next_hourly_run(now);
        }
        if let (Some(next), Some(every)) = (self.next_heartbeat, self.heartbeat_every) {
            if next <= now {
                jobs.push(Job::Heartbeat);
                let mut following = next + every;
                while following <= now {
                    following += every;
                }
                self.next_heartbeat = Some(following);
            }
        }
        jobs
    }
}

/// Shared view of the scheduler, read by the operator bot and the API.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub started_at: DateTime<Utc>,
    pub last_daily: Option<DateTime<Utc>>,
    pub last_hourly: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Latest daily classification, replaced wholesale by each daily pass.
    pub book: TrendBook,
    pub signals_sent: u64,
}

impl SchedulerState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_daily: None,
            last_hourly: None,
            last_heartbeat: None,
            book: TrendBook::new(),
            signals_sent: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run the daily pass now, then resume the timetable.
    RunDaily,
    /// Run the hourly pass now against the current book.
    RunHourly,
    Shutdown,
}

/// Cloneable handle passed to other crates (Telegram, API).
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: Arc<RwLock<SchedulerState>>,
}

impl SchedulerHandle {
    /// Handle over a fixed state with no scheduler behind it. Commands are
    /// dropped. Used by read-only consumers in tests.
    pub fn detached(state: SchedulerState) -> Self {
        let (command_tx, _) = mpsc::channel(1);
        Self {
            command_tx,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn send(&self, cmd: SchedulerCommand) {
        if self.command_tx.send(cmd).await.is_err() {
            warn!(?cmd, "Scheduler is gone, command dropped");
        }
    }

    pub async fn snapshot(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    pub async fn uptime(&self) -> Duration {
        Utc::now() - self.state.read().await.started_at
    }
}

/// Drives the daily, hourly and heartbeat jobs on a single task, so a daily
/// pass always completes before an hourly pass due at the same instant.
pub struct Scheduler {
    jobs: Jobs,
    timetable: Timetable,
    scan_on_startup: bool,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(jobs: Jobs, config: &ScheduleConfig) -> Result<(Self, SchedulerHandle)> {
        let timetable = Timetable::new(config, Utc::now())?;
        let (command_tx, command_rx) = mpsc::channel(16);
        let handle = SchedulerHandle {
            command_tx,
            state: jobs.state(),
        };
        let scheduler = Scheduler {
            jobs,
            timetable,
            scan_on_startup: config.scan_on_startup,
            command_rx,
        };
        Ok((scheduler, handle))
    }

    /// Run until `Shutdown` or until every handle is dropped.
    /// Call from `tokio::spawn`.
    pub async fn run(mut self) {
        self.jobs.restore().await;
        if self.scan_on_startup {
            info!("Startup classification pass");
            self.jobs.daily().await;
        }
        info!(
            next_daily = %self.timetable.next_daily,
            next_hourly = %self.timetable.next_hourly,
            "Scheduler running"
        );

        loop {
            let wake = self.timetable.next_wakeup();
            let sleep_for = (wake - Utc::now()).to_std().unwrap_or_default();

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {
                    for job in self.timetable.due(Utc::now()) {
                        debug!(?job, "Job due");
                        self.run_job(job).await;
                    }
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::RunDaily) => self.run_job(Job::Daily).await,
                    Some(SchedulerCommand::RunHourly) => self.run_job(Job::Hourly).await,
                    Some(SchedulerCommand::Shutdown) => {
                        info!("Scheduler shutting down");
                        break;
                    }
                    None => {
                        warn!("Scheduler command channel closed, shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn run_job(&self, job: Job) {
        match job {
            Job::Daily => self.jobs.daily().await,
            Job::Hourly => self.jobs.hourly().await,
            Job::Heartbeat => self.jobs.heartbeat().await,
        }
    }
}
