//! Relative strength: the ticker's price ratio to a benchmark, its trend,
//! and the ticker's outperformance over the lookback.

use super::{first_non_finite, Extraction, MetricSet, Shortfall};
use crate::config::RelativeStrengthConfig;
use crate::data::align::inner_join;
use crate::domain::Series;
use crate::indicators::{pct_change, slope};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrengthMetrics {
    /// Slope of ticker/benchmark close ratio over the lookback.
    pub rs_slope: f64,
    /// Ticker change minus benchmark change over the lookback, in percentage points.
    pub outperformance: f64,
    pub stock_change_pct: f64,
    pub benchmark_change_pct: f64,
    /// Rows shared by both series after the join.
    pub aligned_len: usize,
    /// Ticker change over the extended window, to spot moves that already ran.
    pub stock_change_20d: f64,
    /// Ratio slope over the short recent window.
    pub recent_slope: f64,
    /// Recent slope positive while the lookback slope is not.
    pub just_turned_positive: bool,
}

impl MetricSet for RelativeStrengthMetrics {
    fn sentinel() -> Self {
        Self {
            rs_slope: 0.0,
            outperformance: 0.0,
            stock_change_pct: 0.0,
            benchmark_change_pct: 0.0,
            aligned_len: 0,
            stock_change_20d: 0.0,
            recent_slope: 0.0,
            just_turned_positive: false,
        }
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("rs_slope", self.rs_slope),
            ("outperformance", self.outperformance),
            ("stock_change_pct", self.stock_change_pct),
            ("benchmark_change_pct", self.benchmark_change_pct),
            ("stock_change_20d", self.stock_change_20d),
            ("recent_slope", self.recent_slope),
        ])
    }
}

pub fn extract_relative_strength(
    series: &Series,
    benchmark: Option<&Series>,
    config: &RelativeStrengthConfig,
) -> Extraction<RelativeStrengthMetrics> {
    let Some(benchmark) = benchmark else {
        return Extraction::InsufficientData(Shortfall::MissingBenchmark);
    };

    let lookback = config.lookback.max(1);
    let required = lookback + config.min_bars_extra;
    let shortest = series.len().min(benchmark.len());
    if shortest < required {
        return Extraction::InsufficientData(Shortfall::Bars {
            required,
            available: shortest,
        });
    }

    // Rows with a non-positive benchmark close cannot form a ratio.
    let aligned: Vec<_> = inner_join(series, benchmark)
        .into_iter()
        .filter(|row| row.benchmark_close > 0.0)
        .collect();
    if aligned.len() < lookback {
        return Extraction::InsufficientData(Shortfall::AlignedRows {
            required: lookback,
            available: aligned.len(),
        });
    }

    let ratio: Vec<f64> = aligned.iter().map(|r| r.close / r.benchmark_close).collect();
    let rs_slope = slope(&ratio, lookback);
    let recent_slope = slope(&ratio, config.recent_window);

    let n = aligned.len();
    let base = &aligned[n - lookback];
    let last = &aligned[n - 1];
    let stock_change_pct = pct_change(base.close, last.close);
    let benchmark_change_pct = pct_change(base.benchmark_close, last.benchmark_close);

    let extended_base = &aligned[n - config.extended_window.clamp(1, n)];
    let stock_change_20d = pct_change(extended_base.close, last.close);

    Extraction::checked(RelativeStrengthMetrics {
        rs_slope,
        outperformance: stock_change_pct - benchmark_change_pct,
        stock_change_pct,
        benchmark_change_pct,
        aligned_len: n,
        stock_change_20d,
        recent_slope,
        just_turned_positive: recent_slope > 0.0 && rs_slope <= 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn series_from(symbol: &str, start_day: i64, closes: &[f64]) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: base + chrono::Duration::days(start_day + i as i64),
                open: c,
                high: c + 1.0,
                low: (c - 1.0).max(0.0),
                close: c,
                volume: 1_000,
            })
            .collect();
        Series::new(symbol, bars).unwrap()
    }

    fn config() -> RelativeStrengthConfig {
        RelativeStrengthConfig::default()
    }

    #[test]
    fn missing_benchmark_is_insufficient() {
        let s = series_from("AAA", 0, &[10.0; 20]);
        assert_eq!(
            extract_relative_strength(&s, None, &config()),
            Extraction::InsufficientData(Shortfall::MissingBenchmark)
        );
    }

    #[test]
    fn short_input_is_insufficient() {
        let s = series_from("AAA", 0, &[10.0; 9]);
        let b = series_from("SPY", 0, &[400.0; 30]);
        assert_eq!(
            extract_relative_strength(&s, Some(&b), &config()),
            Extraction::InsufficientData(Shortfall::Bars { required: 10, available: 9 })
        );
    }

    #[test]
    fn disjoint_dates_are_insufficient_alignment() {
        let s = series_from("AAA", 0, &[10.0; 12]);
        let b = series_from("SPY", 100, &[400.0; 12]);
        assert_eq!(
            extract_relative_strength(&s, Some(&b), &config()),
            Extraction::InsufficientData(Shortfall::AlignedRows { required: 5, available: 0 })
        );
    }

    #[test]
    fn outperformance_over_lookback() {
        // Ticker: base at index n-5 is 100, last is 110 → +10%.
        // Benchmark: base 200, last 204 → +2%.
        let stock = [90.0, 95.0, 98.0, 99.0, 100.0, 102.0, 104.0, 107.0, 110.0];
        let bench = [190.0, 195.0, 198.0, 199.0, 200.0, 201.0, 202.0, 203.0, 204.0];
        let mut s = vec![80.0; 3];
        s.extend(stock);
        let mut b = vec![180.0; 3];
        b.extend(bench);
        let s = series_from("AAA", 0, &s);
        let b = series_from("SPY", 0, &b);

        let Extraction::Computed(m) = extract_relative_strength(&s, Some(&b), &config()) else {
            panic!("expected Computed");
        };
        assert_approx(m.stock_change_pct, 10.0, 1e-9);
        assert_approx(m.benchmark_change_pct, 2.0, 1e-9);
        assert_approx(m.outperformance, 8.0, 1e-9);
        assert!(m.rs_slope > 0.0);
        assert_eq!(m.aligned_len, 12);
    }

    #[test]
    fn rs_slope_matches_ratio_slope() {
        let s_closes: Vec<f64> = (0..15).map(|i| 50.0 + i as f64 * 0.5).collect();
        let b_closes: Vec<f64> = (0..15).map(|i| 400.0 + i as f64).collect();
        let s = series_from("AAA", 0, &s_closes);
        let b = series_from("SPY", 0, &b_closes);
        let Extraction::Computed(m) = extract_relative_strength(&s, Some(&b), &config()) else {
            panic!("expected Computed");
        };
        let ratio: Vec<f64> = s_closes.iter().zip(&b_closes).map(|(a, b)| a / b).collect();
        assert_approx(m.rs_slope, slope(&ratio, 5), DEFAULT_EPSILON);
        assert_approx(m.recent_slope, slope(&ratio, 3), DEFAULT_EPSILON);
    }

    #[test]
    fn only_shared_dates_count() {
        // Benchmark starts 5 days later; 10 shared dates remain.
        let s = series_from("AAA", 0, &[10.0; 15]);
        let b = series_from("SPY", 5, &[400.0; 15]);
        let Extraction::Computed(m) = extract_relative_strength(&s, Some(&b), &config()) else {
            panic!("expected Computed");
        };
        assert_eq!(m.aligned_len, 10);
        assert_approx(m.rs_slope, 0.0, 1e-12);
        assert_eq!(m.outperformance, 0.0);
    }

    #[test]
    fn zero_benchmark_rows_are_dropped() {
        let s = series_from("AAA", 0, &[10.0; 12]);
        let mut b_closes = vec![400.0; 12];
        b_closes[11] = 0.0;
        let b = series_from("SPY", 0, &b_closes);
        let Extraction::Computed(m) = extract_relative_strength(&s, Some(&b), &config()) else {
            panic!("expected Computed");
        };
        assert_eq!(m.aligned_len, 11);
    }

    #[test]
    fn just_turned_positive_flag() {
        // Ratio falls, then ticks up over the last three bars.
        let s_closes = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.5, 7.0, 7.5];
        let s = series_from("AAA", 0, &s_closes);
        let b = series_from("SPY", 0, &[100.0; 13]);
        let Extraction::Computed(m) = extract_relative_strength(&s, Some(&b), &config()) else {
            panic!("expected Computed");
        };
        assert!(m.recent_slope > 0.0);
        assert!(m.rs_slope <= 0.0);
        assert!(m.just_turned_positive);
    }
}
