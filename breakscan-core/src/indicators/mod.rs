//! Indicator library.
//!
//! Pure numeric functions over price/volume slices. No knowledge of scoring;
//! every extractor builds on these. Series-producing indicators return one
//! value per input point, with `f64::NAN` for warmup positions.
//!
//! The bar-based indicators also implement [`Indicator`] so callers can
//! query their name and warmup length uniformly.

pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod slope;
pub mod stats;

pub use ema::{ema, Ema};
pub use macd::{macd, MacdSeries};
pub use obv::{obv, Obv};
pub use rsi::{rsi, Rsi};
pub use slope::slope;
pub use stats::{count_rising, mean, pct_change};

use crate::domain::Bar;

/// Trait for bar-based indicators.
///
/// Takes a full bar series and produces a numeric output series of the same
/// length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_21", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high/low bracket by 1.0,
/// volume = 1000, consecutive calendar days.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
