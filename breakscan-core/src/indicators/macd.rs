//! Moving Average Convergence Divergence (MACD).
//!
//! line = EMA(fast) - EMA(slow), signal = EMA(line, signal), histogram = line - signal.
//! All three series are aligned with the input and inherit the EMA seed
//! convention, so every position has a value.

use super::ema;

/// The three aligned MACD outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdSeries {
    /// Last two histogram values as (current, previous). `None` under two points.
    pub fn last_two_histogram(&self) -> Option<(f64, f64)> {
        let n = self.histogram.len();
        if n < 2 {
            return None;
        }
        Some((self.histogram[n - 1], self.histogram[n - 2]))
    }
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);
    let histogram: Vec<f64> = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}
