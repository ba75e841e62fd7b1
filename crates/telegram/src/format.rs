//! Plain-text message bodies. Pure functions so they can be tested without a bot.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use common::{ApiUsage, Direction, Heartbeat, PairTrendState, Signal, Trend};

/// Maximum signals listed by `/history`.
pub const HISTORY_LIMIT: usize = 10;

pub fn welcome(pair_count: usize, daily_scan_time: &str) -> String {
    format!(
        "FiboBot: Fibonacci multi-timeframe Forex scanner\n\n\
         Watching {pair_count} pairs.\n\
         W1+D1 trend classification daily at {daily_scan_time} UTC, H1 scan every hour.\n\
         You will receive a message for every confirmed signal.\n\n\
         /status - aligned pairs and API credits\n\
         /pairs - weekly and daily detail per pair\n\
         /history - signals from the last 24h\n\
         /stats - weekly counts (weekends only)\n\
         /scan - run the daily and hourly passes now"
    )
}

fn direction_marker(direction: Direction) -> &'static str {
    match direction {
        Direction::Bullish => "\u{1F4C8}",
        Direction::Bearish => "\u{1F4C9}",
    }
}

fn trend_marker(trend: Trend) -> &'static str {
    match trend {
        Trend::Bullish => "\u{1F7E2}",
        Trend::Bearish => "\u{1F534}",
        Trend::Neutral => "\u{26AA}",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn signal_alert(signal: &Signal) -> String {
    format!(
        "{marker} {symbol} {direction} signal\n\
         Price: {price:.5}\n\
         Zone: {zone_min:.5} - {zone_max:.5} (projection {index}/{count})\n\
         Heiken-Ashi confirmed: {confirmed}\n\
         RSI divergence: {rsi}\n\
         S/R confluence: {sr}\n\
         {at}",
        marker = direction_marker(signal.direction),
        symbol = signal.symbol,
        direction = signal.direction.to_string().to_uppercase(),
        price = signal.price,
        zone_min = signal.zone_min,
        zone_max = signal.zone_max,
        index = signal.projection_index,
        count = signal.projection_count,
        confirmed = yes_no(signal.confirmed),
        rsi = yes_no(signal.rsi_divergence),
        sr = yes_no(signal.sr_confluence),
        at = signal.detected_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn symbols_with(states: &[PairTrendState], trend: Trend) -> Vec<&str> {
    states
        .iter()
        .filter(|s| s.trend == trend)
        .map(|s| s.symbol.as_str())
        .collect()
}

fn trend_section(states: &[PairTrendState], trend: Trend) -> String {
    let symbols = symbols_with(states, trend);
    let list = if symbols.is_empty() {
        "none".to_string()
    } else {
        symbols.join(", ")
    };
    format!("{} {} ({}):\n{}", trend_marker(trend), trend, symbols.len(), list)
}

fn trend_sections(states: &[PairTrendState]) -> String {
    [Trend::Bullish, Trend::Bearish, Trend::Neutral]
        .into_iter()
        .map(|t| trend_section(states, t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn daily_summary(states: &[PairTrendState]) -> String {
    format!("Daily W1+D1 classification\n\n{}", trend_sections(states))
}

fn usage_line(usage: Option<ApiUsage>) -> String {
    match usage {
        Some(u) => format!("API credits: {}/{} used, {} left", u.used, u.limit, u.remaining()),
        None => "API credits: n/a".to_string(),
    }
}

pub fn status(
    states: &[PairTrendState],
    usage: Option<ApiUsage>,
    last_daily: Option<DateTime<Utc>>,
    last_hourly: Option<DateTime<Utc>>,
) -> String {
    let when = |at: Option<DateTime<Utc>>| {
        at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    };
    format!(
        "Aligned pairs\n\n{}\n\n{}\nLast daily pass: {}\nLast hourly pass: {}",
        trend_sections(states),
        usage_line(usage),
        when(last_daily),
        when(last_hourly),
    )
}

pub fn pairs_detail(states: &[PairTrendState]) -> String {
    if states.is_empty() {
        return "No pair classification available yet.".to_string();
    }
    let mut out = format!("Pair detail ({})\n", states.len());
    for s in states {
        out.push_str(&format!(
            "\n{} {} - {}\n   W1: {:.5} vs SMA {:.5}\n   D1: {:.5} vs SMA {:.5}\n",
            trend_marker(s.trend),
            s.symbol,
            s.trend,
            s.weekly_price,
            s.weekly_sma,
            s.daily_price,
            s.daily_sma,
        ));
    }
    out
}

/// `signals` newest first; at most `HISTORY_LIMIT` are listed.
pub fn history(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "No signals in the last 24 hours.".to_string();
    }
    let mut out = "Signals, last 24h\n".to_string();
    for s in signals.iter().take(HISTORY_LIMIT) {
        out.push_str(&format!(
            "\n{} {} {} @ {:.5} (projection {}/{})\n   {}\n",
            direction_marker(s.direction),
            s.symbol,
            s.direction.to_string().to_uppercase(),
            s.price,
            s.projection_index,
            s.projection_count,
            s.detected_at.format("%Y-%m-%d %H:%M UTC"),
        ));
    }
    if signals.len() > HISTORY_LIMIT {
        out.push_str(&format!("\n(+{} more)", signals.len() - HISTORY_LIMIT));
    }
    out
}

pub fn is_weekend(at: DateTime<Utc>) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn stats(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "No signals in the last 7 days.".to_string();
    }
    let bullish = signals.iter().filter(|s| s.direction == Direction::Bullish).count();
    let bearish = signals.len() - bullish;
    let divergence = signals.iter().filter(|s| s.rsi_divergence).count();
    let confluence = signals.iter().filter(|s| s.sr_confluence).count();
    format!(
        "Signals, last 7 days\n\n\
         Total: {}\n\
         {} Bullish: {}\n\
         {} Bearish: {}\n\
         With RSI divergence: {}\n\
         With S/R confluence: {}",
        signals.len(),
        trend_marker(Trend::Bullish),
        bullish,
        trend_marker(Trend::Bearish),
        bearish,
        divergence,
        confluence,
    )
}

pub fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.num_minutes().max(0);
    let (days, hours, mins) = (minutes / 1440, (minutes % 1440) / 60, minutes % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else {
        format!("{hours}h {mins}m")
    }
}

pub fn heartbeat(hb: &Heartbeat) -> String {
    format!(
        "FiboBot alive\nUptime: {}\nAligned pairs: {}\n{}",
        format_uptime(hb.uptime),
        hb.aligned_pairs,
        usage_line(hb.usage),
    )
}
