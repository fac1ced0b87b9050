//! Single-ticker evaluation and the composite result record.

use crate::config::ScanConfig;
use crate::domain::Series;
use crate::extract::{
    extract_momentum, extract_relative_strength, extract_volume, CategoryReport, MomentumMetrics,
    RelativeStrengthMetrics, VolumeMetrics,
};
use crate::scoring::{score, AlertTier, ScoreCard};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything known about one (ticker, as-of date) evaluation.
///
/// Every metric field is always present; categories that could not be
/// computed carry their sentinel metrics and a non-`Computed` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub current_price: f64,
    pub current_volume: u64,
    pub volume: CategoryReport<VolumeMetrics>,
    pub momentum: CategoryReport<MomentumMetrics>,
    pub relative_strength: CategoryReport<RelativeStrengthMetrics>,
    pub score: ScoreCard,
    pub policy: String,
    /// BLAKE3 over the configuration and both input series.
    pub fingerprint: String,
}

impl CompositeResult {
    pub fn total(&self) -> u32 {
        self.score.total
    }

    pub fn tier(&self) -> AlertTier {
        self.score.tier
    }

    /// True when the result belongs in an alert list.
    pub fn is_alert(&self) -> bool {
        self.score.alert_triggered
    }

    /// True when every category ran on real data.
    pub fn fully_computed(&self) -> bool {
        self.volume.status.is_computed()
            && self.momentum.status.is_computed()
            && self.relative_strength.status.is_computed()
    }
}

/// Evaluate one ticker as of its last bar.
///
/// Never fails: extractors that cannot run fall back to sentinel metrics
/// and the result simply scores low.
pub fn evaluate(series: &Series, benchmark: Option<&Series>, config: &ScanConfig) -> CompositeResult {
    let volume = extract_volume(series, &config.volume).into_report();
    let momentum = extract_momentum(series, &config.momentum).into_report();
    let relative_strength = extract_relative_strength(series, benchmark, &config.relative_strength).into_report();

    for (category, status) in [
        ("volume", &volume.status),
        ("momentum", &momentum.status),
        ("relative_strength", &relative_strength.status),
    ] {
        if !status.is_computed() {
            debug!(ticker = series.symbol(), category, status = %status.marker(), "using sentinel metrics");
        }
    }

    let card = score(&config.policy, &volume.metrics, &momentum.metrics, &relative_strength.metrics);
    let last = series.last();

    CompositeResult {
        ticker: series.symbol().to_string(),
        as_of: last.date,
        current_price: last.close,
        current_volume: last.volume,
        volume,
        momentum,
        relative_strength,
        score: card,
        policy: config.policy.name.clone(),
        fingerprint: fingerprint(series, benchmark, config),
    }
}

fn fingerprint(series: &Series, benchmark: Option<&Series>, config: &ScanConfig) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(config.fingerprint().as_bytes());
    series.hash_into(&mut hasher);
    if let Some(b) = benchmark {
        b.hash_into(&mut hasher);
    }
    hasher.finalize().to_hex().to_string()
}
