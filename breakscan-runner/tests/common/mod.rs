//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use breakscan_core::data::StaticProvider;
use breakscan_core::{Bar, ScanConfig, Series};
use chrono::NaiveDate;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

/// Date of the last breakout bar.
pub fn event_date() -> NaiveDate {
    start_date() + chrono::Duration::days(89)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// 90 daily bars: a tight base, a 20-day rally, a drifting pullback on
/// light red volume, then five straight up days. Scores 26 (high
/// priority) under the extended policy on its last bar.
pub fn breakout_series(symbol: &str) -> Series {
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

/// Provider holding the benchmark, one breakout and two flat tickers.
pub fn fixture_provider() -> StaticProvider {
    StaticProvider::new()
        .with(benchmark_series())
        .with(breakout_series("BRK"))
        .with(flat_series("AAA", 60))
        .with(flat_series("ZZZ", 60))
}

/// Default config with a lookback wide enough to fetch all 90 bars.
pub fn wide_config() -> ScanConfig {
    let mut config = ScanConfig::default();
    config.scan.data_lookback_days = 365;
    config
}

pub fn tickers(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}
