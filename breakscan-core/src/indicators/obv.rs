//! On-Balance Volume (OBV).
//!
//! Starts at the first bar's volume. Each later bar adds its volume when the
//! close rose, subtracts it when the close fell, and holds when unchanged.
//! Lookback: 0.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        obv(bars)
    }
}

pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let mut result = Vec::with_capacity(bars.len());
    let Some(first) = bars.first() else {
        return result;
    };

    let mut running = first.volume as f64;
    result.push(running);
    for w in bars.windows(2) {
        let (prev, curr) = (&w[0], &w[1]);
        if curr.close > prev.close {
            running += curr.volume as f64;
        } else if curr.close < prev.close {
            running -= curr.volume as f64;
        }
        result.push(running);
    }
    result
}
