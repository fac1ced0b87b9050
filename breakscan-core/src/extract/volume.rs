//! Volume behavior: do down days trade on light volume while price holds
//! above its EMA?

use super::{first_non_finite, Extraction, MetricSet, Shortfall};
use crate::config::VolumeConfig;
use crate::domain::{Bar, Series};
use crate::indicators::{ema, mean};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetrics {
    /// Mean red-day volume over mean window volume. 1.0 when undefined.
    pub red_volume_ratio: f64,
    pub price_above_ma: bool,
    /// Of the last `above_ma_window` bars, how many closed above the EMA.
    pub days_above_ma: usize,
    pub red_day_avg_volume: f64,
    pub green_day_avg_volume: f64,
    pub window_avg_volume: f64,
    pub red_day_count: usize,
    pub green_day_count: usize,
    pub current_price: f64,
    pub current_ema: f64,
}

impl VolumeMetrics {
    /// Green-day over red-day average volume; `None` when either is zero.
    pub fn green_red_spread(&self) -> Option<f64> {
        if self.red_day_avg_volume > 0.0 && self.green_day_avg_volume > 0.0 {
            Some(self.green_day_avg_volume / self.red_day_avg_volume)
        } else {
            None
        }
    }
}

impl MetricSet for VolumeMetrics {
    fn sentinel() -> Self {
        Self {
            red_volume_ratio: 1.0,
            price_above_ma: false,
            days_above_ma: 0,
            red_day_avg_volume: 0.0,
            green_day_avg_volume: 0.0,
            window_avg_volume: 0.0,
            red_day_count: 0,
            green_day_count: 0,
            current_price: 0.0,
            current_ema: 0.0,
        }
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("red_volume_ratio", self.red_volume_ratio),
            ("red_day_avg_volume", self.red_day_avg_volume),
            ("green_day_avg_volume", self.green_day_avg_volume),
            ("window_avg_volume", self.window_avg_volume),
            ("current_price", self.current_price),
            ("current_ema", self.current_ema),
        ])
    }
}

pub fn extract_volume(series: &Series, config: &VolumeConfig) -> Extraction<VolumeMetrics> {
    let required = config.lookback + config.min_bars_extra;
    if series.len() < required || config.lookback == 0 {
        return Extraction::InsufficientData(Shortfall::Bars {
            required,
            available: series.len(),
        });
    }

    let closes = series.closes();
    let ema_values = ema(&closes, config.ema_period);

    let window = series.tail(config.lookback);
    let window_volumes = volumes(window.iter());
    let red_volumes = volumes(window.iter().filter(|b| b.is_red()));
    let green_volumes = volumes(window.iter().filter(|b| b.is_green()));

    let window_avg_volume = mean(&window_volumes).unwrap_or(0.0);
    let red_day_avg_volume = mean(&red_volumes).unwrap_or(window_avg_volume);
    let green_day_avg_volume = mean(&green_volumes).unwrap_or(window_avg_volume);

    let red_volume_ratio = if window_avg_volume > 0.0 {
        red_day_avg_volume / window_avg_volume
    } else {
        1.0
    };

    let n = closes.len();
    let check = config.above_ma_window.min(n);
    let days_above_ma = (n - check..n).filter(|&i| closes[i] > ema_values[i]).count();

    Extraction::checked(VolumeMetrics {
        red_volume_ratio,
        price_above_ma: check > 0 && days_above_ma >= config.above_ma_required,
        days_above_ma,
        red_day_avg_volume,
        green_day_avg_volume,
        window_avg_volume,
        red_day_count: red_volumes.len(),
        green_day_count: green_volumes.len(),
        current_price: closes[n - 1],
        current_ema: ema_values[n - 1],
    })
}

fn volumes<'a>(bars: impl Iterator<Item = &'a Bar>) -> Vec<f64> {
    bars.map(|b| b.volume as f64).collect()
}
