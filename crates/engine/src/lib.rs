pub mod config;
pub mod jobs;
pub mod scheduler;
pub mod store;
pub mod twelvedata;

pub use config::{FileConfig, MarketDataConfig};
pub use jobs::Jobs;
pub use scheduler::{
    ScheduleConfig, Scheduler, SchedulerCommand, SchedulerHandle, SchedulerState,
};
pub use store::SqliteStore;
pub use twelvedata::{RateLimiter, TwelveDataClient};
