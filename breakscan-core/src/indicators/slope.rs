//! Ordinary least-squares slope over a trailing window.
//!
//! x is the index 0..n-1 of the last `lookback` points. The slope is in the
//! series' native units per bar; it is not normalized by price scale.

/// OLS slope of the last `lookback` values.
///
/// Returns 0.0 when the series is shorter than `lookback` or the window has
/// fewer than two points. NaN inputs propagate to the result.
pub fn slope(values: &[f64], lookback: usize) -> f64 {
    if values.len() < lookback {
        return 0.0;
    }
    let window = &values[values.len() - lookback..];
    let n = window.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = window.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rising_is_positive() {
        assert_approx(slope(&[1.0, 2.0, 3.0, 4.0, 5.0], 5), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn falling_is_negative() {
        assert_approx(slope(&[5.0, 4.0, 3.0, 2.0, 1.0], 5), -1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_is_zero() {
        assert_eq!(slope(&[3.0, 3.0, 3.0, 3.0], 4), 0.0);
    }

    #[test]
    fn uses_only_trailing_window() {
        // Early decline is outside the window.
        assert_approx(slope(&[9.0, 1.0, 2.0, 4.0], 3), 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn known_noisy_value() {
        // x = 0..4, y = [2, 4, 5, 4, 5]: slope = 6 / 10
        assert_approx(slope(&[2.0, 4.0, 5.0, 4.0, 5.0], 5), 0.6, DEFAULT_EPSILON);
    }

    #[test]
    fn short_inputs_return_exact_zero() {
        assert_eq!(slope(&[], 5), 0.0);
        assert_eq!(slope(&[1.0], 5), 0.0);
        assert_eq!(slope(&[1.0], 1), 0.0);
        assert_eq!(slope(&[1.0, 2.0, 3.0], 5), 0.0);
        assert_eq!(slope(&[1.0, 2.0, 3.0], 0), 0.0);
    }

    #[test]
    fn nan_propagates() {
        assert!(slope(&[1.0, f64::NAN, 3.0], 3).is_nan());
    }
}
