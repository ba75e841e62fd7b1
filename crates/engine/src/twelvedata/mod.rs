pub mod client;
pub mod limiter;

pub use client::TwelveDataClient;
pub use limiter::{Admission, CreditLedger, RateLimiter};
