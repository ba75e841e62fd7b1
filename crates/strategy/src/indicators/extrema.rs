use serde::{Deserialize, Serialize};

/// Which side of the series a local extremum sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumKind {
    Peak,
    Trough,
}

/// A local high or low in a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Absolute index into the full series, not into the lookback window.
    pub index: usize,
    pub price: f64,
    pub kind: ExtremumKind,
}

/// Three-neighbor extremum scan over the trailing `lookback` items of `series`.
///
/// An item at window position `i` (1 ≤ i ≤ len−2) is a peak when `value` is
/// strictly greater than both neighbors, a trough when strictly smaller.
/// The first and last items of the window are never reported. Returned
/// indices are offset back into `series`, in chronological order.
pub fn local_extrema<T, F>(
    series: &[T],
    lookback: usize,
    kind: ExtremumKind,
    value: F,
) -> Vec<SwingPoint>
where
    F: Fn(&T) -> f64,
{
    if series.len() < 3 {
        return Vec::new();
    }

    let start = series.len().saturating_sub(lookback);
    let window = &series[start..];
    if window.len() < 3 {
        return Vec::new();
    }

    window
        .windows(3)
        .enumerate()
        .filter_map(|(i, w)| {
            let (prev, curr, next) = (value(&w[0]), value(&w[1]), value(&w[2]));
            let hit = match kind {
                ExtremumKind::Peak => curr > prev && curr > next,
                ExtremumKind::Trough => curr < prev && curr < next,
            };
            hit.then_some(SwingPoint {
                index: start + i + 1,
                price: curr,
                kind,
            })
        })
        .collect()
}
