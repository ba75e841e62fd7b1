pub mod config;
pub mod error;
pub mod notify;
pub mod source;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use notify::{Heartbeat, Notifier};
pub use source::CandleSource;
pub use store::SignalStore;
pub use types::*;
