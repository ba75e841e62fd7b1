use std::collections::BTreeMap;

use common::{Direction, PairTrendState, Trend};

/// Keyed store of the latest daily classification, one record per symbol.
///
/// Produced by the daily pass and handed to the hourly pass; the hourly pass
/// only reads it. Ordered by symbol so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TrendBook {
    states: BTreeMap<String, PairTrendState>,
}

impl TrendBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records, e.g. after a restart.
    pub fn from_states(states: impl IntoIterator<Item = PairTrendState>) -> Self {
        let mut book = Self::new();
        for state in states {
            book.insert(state);
        }
        book
    }

    /// Replace the record for `state.symbol` wholesale.
    pub fn insert(&mut self, state: PairTrendState) {
        self.states.insert(state.symbol.clone(), state);
    }

    pub fn get(&self, symbol: &str) -> Option<&PairTrendState> {
        self.states.get(symbol)
    }

    /// Trend of `symbol`; unknown symbols are `Neutral`.
    pub fn trend(&self, symbol: &str) -> Trend {
        self.get(symbol).map(|s| s.trend).unwrap_or(Trend::Neutral)
    }

    /// Symbols whose weekly and daily trends agree, with their direction.
    pub fn aligned(&self) -> impl Iterator<Item = (&str, Direction)> + '_ {
        self.states
            .values()
            .filter_map(|s| s.trend.direction().map(|d| (s.symbol.as_str(), d)))
    }

    pub fn symbols_with(&self, trend: Trend) -> Vec<&str> {
        self.states
            .values()
            .filter(|s| s.trend == trend)
            .map(|s| s.symbol.as_str())
            .collect()
    }

    pub fn states(&self) -> impl Iterator<Item = &PairTrendState> + '_ {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
