pub mod config;
pub mod indicators;
pub mod scanner;
pub mod trend_book;

pub use config::ScannerConfig;
pub use scanner::{classify_alignment, HourlyOutcome, Scanner};
pub use trend_book::TrendBook;
