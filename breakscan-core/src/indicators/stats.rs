//! Small numeric helpers shared by the extractors.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentage change from `base` to `current`. A zero base yields 0.0.
pub fn pct_change(base: f64, current: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    (current - base) / base * 100.0
}

/// Number of strictly positive step-to-step changes among the last `steps` changes.
///
/// Needs `steps + 1` values; with fewer, counts whatever changes exist.
pub fn count_rising(values: &[f64], steps: usize) -> usize {
    let start = values.len().saturating_sub(steps + 1);
    values[start..].windows(2).filter(|w| w[1] - w[0] > 0.0).count()
}
