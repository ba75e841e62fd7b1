pub mod extrema;
pub mod fibonacci;
pub mod heiken_ashi;
pub mod rsi;
pub mod technical;

pub use extrema::{local_extrema, ExtremumKind, SwingPoint};
pub use fibonacci::{
    build_projections, find_swing_points, last_peak, last_trough, levels, match_zone, FibLevel,
    FibLevels, FibonacciProjection, SwingPoints,
};
pub use heiken_ashi::{
    color_change, is_body_outside_zone, to_heiken_ashi, ColorChange, HeikenAshiCandle,
    HeikenAshiFold,
};
pub use rsi::RsiIndicator;
pub use technical::{
    check_level_confluence, classify_trend, find_support_resistance, moving_average,
    SupportResistance,
};
