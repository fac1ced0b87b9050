//! Shared fixtures for core integration tests.

#![allow(dead_code)]

use breakscan_core::{Bar, Series};
use chrono::NaiveDate;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// 90 bars: a tight base, a 20-day rally, a drifting pullback, then five
/// straight up days.
///
/// Each bar opens at the previous close, so down days are red. Red days
/// trade 250k shares and green days 1.2M.
pub fn breakout_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = Vec::with_capacity(90);
    for i in 0..90 {
        let c = if i < 40 {
            if i % 2 == 1 { 50.3 } else { 49.7 }
        } else if i < 60 {
            closes[i - 1] * 1.012
        } else if i < 85 {
            closes[i - 1] + if i % 2 == 1 { 0.4 } else { -0.5 }
        } else {
            closes[i - 1] + 0.3
        };
        closes.push(round2(c));
    }
    closes
}

pub fn breakout_series(symbol: &str) -> Series {
    let closes = breakout_closes();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: start_date() + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 0.25,
                low: open.min(close) - 0.25,
                close,
                volume: if close < open { 250_000 } else { 1_200_000 },
            }
        })
        .collect();
    Series::new(symbol, bars).unwrap()
}

/// A slowly drifting benchmark with alternating small moves.
pub fn benchmark_series() -> Series {
    let bars = (0..90)
        .map(|i| {
            let wiggle = if i % 2 == 1 { 0.5 } else { -0.5 };
            let close = round2(400.0 + wiggle + 0.05 * i as f64);
            Bar {
                date: start_date() + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 50_000_000,
            }
        })
        .collect();
    Series::new("SPY", bars).unwrap()
}

/// Flat, low-activity series that should never alert.
pub fn flat_series(symbol: &str, n: usize) -> Series {
    let bars = (0..n)
        .map(|i| Bar {
            date: start_date() + chrono::Duration::days(i as i64),
            open: 20.0,
            high: 20.5,
            low: 19.5,
            close: 20.0,
            volume: 100_000,
        })
        .collect();
    Series::new(symbol, bars).unwrap()
}
