//! Momentum: RSI level and slope against price slope, MACD histogram
//! transition, and OBV consistency.

use super::{first_non_finite, Extraction, MetricSet, Shortfall};
use crate::config::MomentumConfig;
use crate::domain::Series;
use crate::indicators::{count_rising, macd, rsi, slope, Indicator, Obv};
use serde::{Deserialize, Serialize};

/// Where the current RSI sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    /// Below 35.
    Oversold,
    /// 35 up to 40.
    Early,
    /// 40 through 65.
    Accumulation,
    /// Above 65 through 70.
    Extended,
    /// Above 70.
    Overbought,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi < 35.0 {
            RsiZone::Oversold
        } else if rsi < 40.0 {
            RsiZone::Early
        } else if rsi <= 65.0 {
            RsiZone::Accumulation
        } else if rsi <= 70.0 {
            RsiZone::Extended
        } else {
            RsiZone::Overbought
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RsiZone::Oversold => "Oversold",
            RsiZone::Early => "Early accumulation",
            RsiZone::Accumulation => "Accumulation zone",
            RsiZone::Extended => "Getting extended",
            RsiZone::Overbought => "Overbought",
        }
    }
}

/// MACD histogram transition between the last two bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdState {
    /// Positive but no larger than the fresh threshold.
    FreshlyPositive,
    /// Above the fresh threshold.
    StronglyPositive,
    /// At or below zero and higher than the previous bar.
    ImprovingFromNegative,
    /// At or below zero and not improving.
    Weakening,
}

impl MacdState {
    pub fn classify(current: f64, previous: f64, fresh_max: f64) -> Self {
        if current > 0.0 {
            if current <= fresh_max {
                MacdState::FreshlyPositive
            } else {
                MacdState::StronglyPositive
            }
        } else if current > previous {
            MacdState::ImprovingFromNegative
        } else {
            MacdState::Weakening
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            MacdState::FreshlyPositive => "Just turned positive",
            MacdState::StronglyPositive => "Positive",
            MacdState::ImprovingFromNegative => "Improving from negative",
            MacdState::Weakening => "Negative/neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumMetrics {
    pub rsi_current: f64,
    pub rsi_slope: f64,
    pub price_slope: f64,
    pub macd_histogram: f64,
    pub macd_histogram_prev: f64,
    pub obv_days_rising: usize,
    pub rsi_zone: RsiZone,
    pub macd_state: MacdState,
}

impl MomentumMetrics {
    /// RSI rising while price is flat or falling.
    pub fn has_divergence(&self, max_price_slope: f64) -> bool {
        self.rsi_slope > 0.0 && self.price_slope <= max_price_slope
    }
}

impl MetricSet for MomentumMetrics {
    fn sentinel() -> Self {
        Self {
            rsi_current: 50.0,
            rsi_slope: 0.0,
            price_slope: 0.0,
            macd_histogram: 0.0,
            macd_histogram_prev: 0.0,
            obv_days_rising: 0,
            rsi_zone: RsiZone::classify(50.0),
            macd_state: MacdState::Weakening,
        }
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("rsi_current", self.rsi_current),
            ("rsi_slope", self.rsi_slope),
            ("price_slope", self.price_slope),
            ("macd_histogram", self.macd_histogram),
            ("macd_histogram_prev", self.macd_histogram_prev),
        ])
    }
}

pub fn extract_momentum(series: &Series, config: &MomentumConfig) -> Extraction<MomentumMetrics> {
    let required = config.min_bars.max(2);
    if series.len() < required {
        return Extraction::InsufficientData(Shortfall::Bars {
            required,
            available: series.len(),
        });
    }

    if config.rsi_period == 0 {
        return Extraction::Failed {
            reason: "rsi_period must be at least 1".into(),
        };
    }

    let bars = series.bars();
    let closes = series.closes();

    let rsi_values = rsi(&closes, config.rsi_period);
    let rsi_current = rsi_values[rsi_values.len() - 1];
    let rsi_slope = slope(&rsi_values, config.slope_lookback);
    let price_slope = slope(&closes, config.slope_lookback);

    let macd_series = macd(&closes, config.macd_fast, config.macd_slow, config.macd_signal);
    let Some((macd_histogram, macd_histogram_prev)) = macd_series.last_two_histogram() else {
        return Extraction::InsufficientData(Shortfall::Bars {
            required: 2,
            available: closes.len(),
        });
    };

    let obv_values = Obv.compute(bars);
    let obv_days_rising = count_rising(&obv_values, config.obv_window);

    Extraction::checked(MomentumMetrics {
        rsi_current,
        rsi_slope,
        price_slope,
        macd_histogram,
        macd_histogram_prev,
        obv_days_rising,
        rsi_zone: RsiZone::classify(rsi_current),
        macd_state: MacdState::classify(macd_histogram, macd_histogram_prev, config.macd_fresh_max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::indicators::{assert_approx, make_bars};

    fn series(closes: &[f64]) -> Series {
        Series::new("TEST", make_bars(closes)).unwrap()
    }

    fn config() -> MomentumConfig {
        MomentumConfig::default()
    }

    #[test]
    fn ten_bars_is_sentinel_path() {
        let closes: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let result = extract_momentum(&series(&closes), &config());
        assert_eq!(
            result,
            Extraction::InsufficientData(Shortfall::Bars { required: 30, available: 10 })
        );
        let report = result.into_report();
        assert_eq!(report.metrics.rsi_current, 50.0);
        assert_eq!(report.metrics.rsi_slope, 0.0);
        assert_eq!(report.metrics.obv_days_rising, 0);
    }

    #[test]
    fn steady_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let Extraction::Computed(m) = extract_momentum(&series(&closes), &config()) else {
            panic!("expected Computed");
        };
        assert_eq!(m.rsi_current, 100.0);
        assert_eq!(m.rsi_slope, 0.0);
        assert_approx(m.price_slope, 1.0, 1e-9);
        assert_eq!(m.obv_days_rising, 5);
        assert_eq!(m.rsi_zone, RsiZone::Overbought);
        assert!(!m.has_divergence(0.5));
    }

    #[test]
    fn obv_counts_only_last_five_changes() {
        // 30 flat bars, then down, then four up days.
        let mut closes = vec![50.0; 30];
        closes.extend([49.0, 49.5, 50.0, 50.5, 51.0]);
        let Extraction::Computed(m) = extract_momentum(&series(&closes), &config()) else {
            panic!("expected Computed");
        };
        assert_eq!(m.obv_days_rising, 4);
    }

    #[test]
    fn macd_histogram_is_last_two_bars() {
        let closes: Vec<f64> = (0..45).map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0).collect();
        let Extraction::Computed(m) = extract_momentum(&series(&closes), &config()) else {
            panic!("expected Computed");
        };
        let full = macd(&closes, 12, 26, 9);
        assert_eq!(m.macd_histogram, full.histogram[44]);
        assert_eq!(m.macd_histogram_prev, full.histogram[43]);
        assert_eq!(m.macd_state, MacdState::classify(full.histogram[44], full.histogram[43], 0.1));
    }

    #[test]
    fn rsi_period_longer_than_series_fails() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let cfg = MomentumConfig {
            rsi_period: 40,
            ..config()
        };
        match extract_momentum(&series(&closes), &cfg) {
            Extraction::Failed { reason } => assert!(reason.contains("rsi_current")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn zero_rsi_period_fails() {
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let cfg = MomentumConfig {
            rsi_period: 0,
            ..config()
        };
        match extract_momentum(&series(&closes), &cfg) {
            Extraction::Failed { reason } => assert!(reason.contains("rsi_period")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn zone_boundaries() {
        assert_eq!(RsiZone::classify(34.9), RsiZone::Oversold);
        assert_eq!(RsiZone::classify(35.0), RsiZone::Early);
        assert_eq!(RsiZone::classify(40.0), RsiZone::Accumulation);
        assert_eq!(RsiZone::classify(65.0), RsiZone::Accumulation);
        assert_eq!(RsiZone::classify(70.0), RsiZone::Extended);
        assert_eq!(RsiZone::classify(70.1), RsiZone::Overbought);
    }

    #[test]
    fn macd_state_classification() {
        assert_eq!(MacdState::classify(0.05, -0.1, 0.1), MacdState::FreshlyPositive);
        assert_eq!(MacdState::classify(0.5, 0.4, 0.1), MacdState::StronglyPositive);
        assert_eq!(MacdState::classify(-0.2, -0.3, 0.1), MacdState::ImprovingFromNegative);
        assert_eq!(MacdState::classify(0.0, -0.3, 0.1), MacdState::ImprovingFromNegative);
        assert_eq!(MacdState::classify(-0.3, -0.2, 0.1), MacdState::Weakening);
        assert_eq!(MacdState::classify(0.0, 0.0, 0.1), MacdState::Weakening);
    }

    #[test]
    fn divergence_requires_rising_rsi_and_flat_price() {
        let mut m = MomentumMetrics::sentinel();
        m.rsi_slope = 1.2;
        m.price_slope = 0.5;
        assert!(m.has_divergence(0.5));
        m.price_slope = 0.51;
        assert!(!m.has_divergence(0.5));
        m.price_slope = -1.0;
        m.rsi_slope = 0.0;
        assert!(!m.has_divergence(0.5));
    }

    #[test]
    fn ignores_unused_bar_fields() {
        let mut bars = make_bars(&(0..35).map(|i| 20.0 + i as f64 * 0.1).collect::<Vec<_>>());
        let a = extract_momentum(&Series::new("A", bars.clone()).unwrap(), &config());
        for b in bars.iter_mut() {
            *b = Bar {
                high: b.high + 5.0,
                low: b.low - 0.5,
                ..*b
            };
        }
        let b = extract_momentum(&Series::new("A", bars).unwrap(), &config());
        assert_eq!(a, b);
    }
}
