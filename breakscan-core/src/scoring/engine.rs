//! Scoring engine: metric sets in, bounded category scores and a tier out.
//!
//! Pure and total. Sentinel metrics score like any other input, so a ticker
//! with missing data still gets a (low) score rather than an error.

use super::bands::BandTable;
use super::policy::{MomentumPolicy, RelativeStrengthPolicy, ScoringPolicy, VolumePolicy};
use super::tier::AlertTier;
use crate::extract::{MomentumMetrics, RelativeStrengthMetrics, VolumeMetrics};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Volume,
    Momentum,
    RelativeStrength,
}

impl Category {
    pub fn title(self) -> &'static str {
        match self {
            Category::Volume => "Volume",
            Category::Momentum => "Momentum",
            Category::RelativeStrength => "Relative Strength",
        }
    }
}

/// One scored line item, kept for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub value: f64,
    pub points: i32,
    pub label: String,
}

impl ScoreComponent {
    fn new(name: &str, value: f64, points: i32, label: &str) -> Self {
        Self {
            name: name.into(),
            value,
            points,
            label: label.into(),
        }
    }

    fn from_table(name: &str, table: &BandTable, value: f64) -> Self {
        let m = table.lookup(value);
        Self::new(name, value, m.points, m.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    /// Sum of component points clamped to `[0, cap]`.
    pub points: u32,
    pub cap: u32,
    /// Whether `points` reached the policy's signal threshold.
    pub signal: bool,
    pub components: Vec<ScoreComponent>,
}

impl CategoryScore {
    fn from_components(category: Category, cap: u32, signal_threshold: u32, components: Vec<ScoreComponent>) -> Self {
        let raw: i64 = components.iter().map(|c| i64::from(c.points)).sum();
        let points = raw.clamp(0, i64::from(cap)) as u32;
        Self {
            category,
            points,
            cap,
            signal: points >= signal_threshold,
            components,
        }
    }

    pub fn component(&self, name: &str) -> Option<&ScoreComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub volume: CategoryScore,
    pub momentum: CategoryScore,
    pub relative_strength: CategoryScore,
    pub total: u32,
    pub max_total: u32,
    /// Categories whose signal fired (0 to 3).
    pub signals_met: u32,
    pub tier: AlertTier,
    pub alert_triggered: bool,
}

impl ScoreCard {
    pub fn categories(&self) -> [&CategoryScore; 3] {
        [&self.volume, &self.momentum, &self.relative_strength]
    }
}

pub fn score(
    policy: &ScoringPolicy,
    volume: &VolumeMetrics,
    momentum: &MomentumMetrics,
    relative_strength: &RelativeStrengthMetrics,
) -> ScoreCard {
    let volume = score_volume(&policy.volume, volume);
    let momentum = score_momentum(&policy.momentum, momentum);
    let relative_strength = score_relative_strength(&policy.relative_strength, relative_strength);

    let total = volume.points + momentum.points + relative_strength.points;
    let signals_met = [&volume, &momentum, &relative_strength]
        .iter()
        .filter(|c| c.signal)
        .count() as u32;
    let tier = policy.tiers.tier_for(total);

    ScoreCard {
        total,
        max_total: policy.max_total(),
        signals_met,
        tier,
        alert_triggered: policy.tiers.alert_triggered(tier, signals_met),
        volume,
        momentum,
        relative_strength,
    }
}

pub fn score_volume(policy: &VolumePolicy, m: &VolumeMetrics) -> CategoryScore {
    let ratio = ScoreComponent::from_table("red_volume_ratio", &policy.ratio, m.red_volume_ratio);

    let above_ma_earned = m.price_above_ma && (!policy.above_ma_requires_ratio_points || ratio.points > 0);
    let above_ma = ScoreComponent::new(
        "price_above_ema",
        if m.price_above_ma { 1.0 } else { 0.0 },
        if above_ma_earned { policy.above_ma_points } else { 0 },
        if m.price_above_ma { "Holding above EMA" } else { "Below EMA" },
    );

    let mut components = vec![ratio, above_ma];
    if let Some(table) = &policy.spread {
        components.push(match m.green_red_spread() {
            Some(spread) => ScoreComponent::from_table("red_green_spread", table, spread),
            None => ScoreComponent::new("red_green_spread", 0.0, 0, "No data"),
        });
    }

    CategoryScore::from_components(Category::Volume, policy.cap, policy.signal_threshold, components)
}

pub fn score_momentum(policy: &MomentumPolicy, m: &MomentumMetrics) -> CategoryScore {
    let divergence = if m.has_divergence(policy.divergence_max_price_slope) {
        ScoreComponent::from_table("rsi_divergence", &policy.divergence, m.rsi_slope)
    } else {
        ScoreComponent::new("rsi_divergence", m.rsi_slope, 0, "None")
    };

    let components = vec![
        divergence,
        ScoreComponent::from_table("rsi_zone", &policy.rsi_zone, m.rsi_current),
        ScoreComponent::new(
            "macd_status",
            m.macd_histogram,
            policy.macd.points_for(m.macd_state),
            m.macd_state.describe(),
        ),
        ScoreComponent::from_table("obv_consistency", &policy.obv, m.obv_days_rising as f64),
    ];

    CategoryScore::from_components(Category::Momentum, policy.cap, policy.signal_threshold, components)
}

pub fn score_relative_strength(policy: &RelativeStrengthPolicy, m: &RelativeStrengthMetrics) -> CategoryScore {
    let components = vec![
        ScoreComponent::from_table("rs_slope", &policy.slope, m.rs_slope),
        ScoreComponent::from_table("outperformance", &policy.outperformance, m.outperformance),
    ];
    CategoryScore::from_components(
        Category::RelativeStrength,
        policy.cap,
        policy.signal_threshold,
        components,
    )
}
