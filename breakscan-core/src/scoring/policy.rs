//! Scoring policies.
//!
//! A policy is plain data: every breakpoint, bonus, cap and tier threshold the
//! engine uses. Three presets ship; [`ScoringPolicy::preset`] selects one by
//! name and a full policy can also be given in a config file.

use super::bands::{Band, BandTable, Bound, Trend};
use super::tier::TierThresholds;
use crate::extract::MacdState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("policy '{policy}': table '{table}' breaks its {trend:?} trend between {from} and {to}")]
    NonMonotonic {
        policy: String,
        table: String,
        trend: Trend,
        from: f64,
        to: f64,
    },

    #[error("policy '{policy}': {field} is invalid: {reason}")]
    Invalid {
        policy: String,
        field: String,
        reason: String,
    },
}

/// Named presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPreset {
    /// 35-point scale; the canonical policy.
    Extended,
    /// 30-point scale with a two-of-three signal alert.
    Basic,
    /// Extended variant that penalizes already-extended moves.
    EarlyEntry,
}

impl PolicyPreset {
    pub const ALL: [PolicyPreset; 3] = [PolicyPreset::Extended, PolicyPreset::Basic, PolicyPreset::EarlyEntry];

    pub fn name(self) -> &'static str {
        match self {
            PolicyPreset::Extended => "extended",
            PolicyPreset::Basic => "basic",
            PolicyPreset::EarlyEntry => "early_entry",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePolicy {
    pub cap: u32,
    pub signal_threshold: u32,
    pub above_ma_points: i32,
    /// Award the above-MA bonus only when the ratio table scored.
    pub above_ma_requires_ratio_points: bool,
    pub ratio: BandTable,
    /// Keyed on green-day / red-day average volume.
    pub spread: Option<BandTable>,
}

/// Points per MACD histogram state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoints {
    pub freshly_positive: i32,
    pub strongly_positive: i32,
    pub improving_from_negative: i32,
    pub weakening: i32,
}

impl MacdPoints {
    pub fn points_for(&self, state: MacdState) -> i32 {
        match state {
            MacdState::FreshlyPositive => self.freshly_positive,
            MacdState::StronglyPositive => self.strongly_positive,
            MacdState::ImprovingFromNegative => self.improving_from_negative,
            MacdState::Weakening => self.weakening,
        }
    }

    fn max_points(&self) -> i32 {
        self.freshly_positive
            .max(self.strongly_positive)
            .max(self.improving_from_negative)
            .max(self.weakening)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumPolicy {
    pub cap: u32,
    pub signal_threshold: u32,
    /// Divergence: RSI slope > 0 while price slope <= this.
    pub divergence_max_price_slope: f64,
    /// Keyed on RSI slope; consulted only when divergence is present.
    pub divergence: BandTable,
    /// Keyed on current RSI.
    pub rsi_zone: BandTable,
    pub macd: MacdPoints,
    /// Keyed on OBV rising-day count.
    pub obv: BandTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrengthPolicy {
    pub cap: u32,
    pub signal_threshold: u32,
    pub slope: BandTable,
    /// Keyed on outperformance in percentage points.
    pub outperformance: BandTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub name: String,
    pub tiers: TierThresholds,
    pub volume: VolumePolicy,
    pub momentum: MomentumPolicy,
    pub relative_strength: RelativeStrengthPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::extended()
    }
}

impl ScoringPolicy {
    pub fn preset(name: &str) -> Option<Self> {
        PolicyPreset::from_name(name).map(Self::from_preset)
    }

    pub fn from_preset(preset: PolicyPreset) -> Self {
        match preset {
            PolicyPreset::Extended => Self::extended(),
            PolicyPreset::Basic => Self::basic(),
            PolicyPreset::EarlyEntry => Self::early_entry(),
        }
    }

    /// Sum of the category caps.
    pub fn max_total(&self) -> u32 {
        self.volume.cap + self.momentum.cap + self.relative_strength.cap
    }

    /// 35 points: volume 15, momentum 12, relative strength 8.
    pub fn extended() -> Self {
        Self {
            name: "extended".into(),
            tiers: TierThresholds {
                high_priority: 20,
                watch_list: Some(15),
                signals_required: None,
            },
            volume: VolumePolicy {
                cap: 15,
                signal_threshold: 6,
                above_ma_points: 3,
                above_ma_requires_ratio_points: false,
                ratio: extended_ratio_table(),
                spread: Some(BandTable::new(
                    Trend::Increasing,
                    vec![
                        Band::new(Bound::Above(2.0), 2, "Huge spread"),
                        Band::new(Bound::Above(1.5), 1, "Good spread"),
                    ],
                    0,
                    "Minimal spread",
                )),
            },
            momentum: MomentumPolicy {
                cap: 12,
                signal_threshold: 6,
                divergence_max_price_slope: 0.5,
                divergence: BandTable::new(
                    Trend::Increasing,
                    vec![
                        Band::new(Bound::Above(2.0), 4, "Strong"),
                        Band::new(Bound::Above(1.0), 3, "Moderate"),
                        Band::new(Bound::Above(0.5), 2, "Slight"),
                    ],
                    2,
                    "Weak",
                ),
                rsi_zone: BandTable::new(
                    Trend::Unimodal,
                    vec![Band::new(Bound::Between(40.0, 65.0), 2, "Accumulation zone")],
                    0,
                    "Outside zone",
                ),
                macd: MacdPoints {
                    freshly_positive: 3,
                    strongly_positive: 3,
                    improving_from_negative: 2,
                    weakening: 0,
                },
                obv: obv_table(3, 2, 1),
            },
            relative_strength: RelativeStrengthPolicy {
                cap: 8,
                signal_threshold: 4,
                slope: rs_slope_table(4, 3, 2),
                outperformance: BandTable::new(
                    Trend::Increasing,
                    vec![
                        Band::new(Bound::Above(5.0), 4, "Strong outperformance"),
                        Band::new(Bound::Above(3.0), 3, "Solid outperformance"),
                        Band::new(Bound::Above(1.0), 2, "Moderate outperformance"),
                        Band::new(Bound::Above(0.0), 1, "Slight outperformance"),
                    ],
                    0,
                    "Underperforming",
                ),
            },
        }
    }

    /// 30 points, 10 per category. Alerts on two of three category signals.
    pub fn basic() -> Self {
        Self {
            name: "basic".into(),
            tiers: TierThresholds {
                high_priority: 20,
                watch_list: None,
                signals_required: Some(2),
            },
            volume: VolumePolicy {
                cap: 10,
                signal_threshold: 7,
                above_ma_points: 3,
                above_ma_requires_ratio_points: true,
                ratio: BandTable::new(
                    Trend::Decreasing,
                    vec![
                        Band::new(Bound::Below(0.4), 7, "Extreme dry-up"),
                        Band::new(Bound::Below(0.5), 6, "Excellent dry-up"),
                        Band::new(Bound::Below(0.6), 5, "Very good dry-up"),
                        Band::new(Bound::Below(0.7), 4, "Good dry-up"),
                        Band::new(Bound::Below(0.8), 3, "Decent dry-up"),
                        Band::new(Bound::Below(0.9), 2, "Some dry-up"),
                        Band::new(Bound::Below(1.0), 1, "Slight dry-up"),
                    ],
                    0,
                    "No dry-up",
                ),
                spread: None,
            },
            momentum: MomentumPolicy {
                cap: 10,
                signal_threshold: 6,
                divergence_max_price_slope: 0.5,
                divergence: BandTable::new(
                    Trend::Increasing,
                    vec![Band::new(Bound::Above(1.0), 4, "Strong")],
                    3,
                    "Present",
                ),
                rsi_zone: BandTable::new(
                    Trend::Unimodal,
                    vec![Band::new(Bound::Between(40.0, 65.0), 2, "Accumulation zone")],
                    0,
                    "Outside zone",
                ),
                macd: MacdPoints {
                    freshly_positive: 2,
                    strongly_positive: 2,
                    improving_from_negative: 2,
                    weakening: 0,
                },
                obv: obv_table(2, 2, 1),
            },
            relative_strength: RelativeStrengthPolicy {
                cap: 10,
                signal_threshold: 6,
                slope: BandTable::new(
                    Trend::Increasing,
                    vec![
                        Band::new(Bound::Above(0.002), 6, "Rising strongly"),
                        Band::new(Bound::Above(0.0), 5, "Rising"),
                    ],
                    0,
                    "Flat or falling",
                ),
                outperformance: BandTable::new(
                    Trend::Increasing,
                    vec![
                        Band::new(Bound::Above(3.0), 4, "Solid outperformance"),
                        Band::new(Bound::Above(1.0), 3, "Moderate outperformance"),
                        Band::new(Bound::Above(0.0), 2, "Slight outperformance"),
                    ],
                    0,
                    "Underperforming",
                ),
            },
        }
    }

    /// Extended scale tuned to favour setups that have not run yet.
    ///
    /// Overbought RSI and very large outperformance lose points; MACD earns
    /// full credit only while negative-but-improving or just turned positive.
    pub fn early_entry() -> Self {
        let mut policy = Self::extended();
        policy.name = "early_entry".into();
        policy.momentum.rsi_zone = BandTable::new(
            Trend::Unimodal,
            vec![
                Band::new(Bound::Between(40.0, 65.0), 3, "Accumulation zone"),
                Band::new(Bound::Between(35.0, 40.0), 1, "Early"),
                Band::new(Bound::Above(70.0), -2, "Overbought"),
            ],
            0,
            "Outside zone",
        );
        policy.momentum.macd = MacdPoints {
            freshly_positive: 3,
            strongly_positive: 1,
            improving_from_negative: 3,
            weakening: 0,
        };
        policy.relative_strength.outperformance = BandTable::new(
            Trend::Unimodal,
            vec![
                Band::new(Bound::Above(12.0), -2, "Chasing"),
                Band::new(Bound::Above(10.0), 0, "Extended"),
                Band::new(Bound::Above(6.0), 1, "Running"),
                Band::new(Bound::Above(3.0), 3, "Solid outperformance"),
                Band::new(Bound::Above(0.0), 4, "Early outperformance"),
            ],
            0,
            "Underperforming",
        );
        policy
    }

    /// Check caps, thresholds and every table's declared trend.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let invalid = |field: &str, reason: String| PolicyError::Invalid {
            policy: self.name.clone(),
            field: field.into(),
            reason,
        };

        for (field, cap, threshold) in [
            ("volume", self.volume.cap, self.volume.signal_threshold),
            ("momentum", self.momentum.cap, self.momentum.signal_threshold),
            (
                "relative_strength",
                self.relative_strength.cap,
                self.relative_strength.signal_threshold,
            ),
        ] {
            if cap == 0 {
                return Err(invalid(field, "cap must be > 0".into()));
            }
            if threshold > cap {
                return Err(invalid(
                    field,
                    format!("signal threshold {threshold} exceeds cap {cap}"),
                ));
            }
        }

        if !self.momentum.divergence_max_price_slope.is_finite() {
            return Err(invalid("momentum.divergence_max_price_slope", "must be finite".into()));
        }
        if self.momentum.macd.max_points() < 0 {
            return Err(invalid("momentum.macd", "no state earns points".into()));
        }

        self.tiers
            .validate(self.max_total())
            .map_err(|reason| invalid("tiers", reason))?;

        let mut tables: Vec<(&str, &BandTable)> = vec![
            ("volume.ratio", &self.volume.ratio),
            ("momentum.divergence", &self.momentum.divergence),
            ("momentum.rsi_zone", &self.momentum.rsi_zone),
            ("momentum.obv", &self.momentum.obv),
            ("relative_strength.slope", &self.relative_strength.slope),
            ("relative_strength.outperformance", &self.relative_strength.outperformance),
        ];
        if let Some(spread) = &self.volume.spread {
            tables.push(("volume.spread", spread));
        }

        for (table, t) in tables {
            if let Err((from, to)) = t.check_trend() {
                return Err(PolicyError::NonMonotonic {
                    policy: self.name.clone(),
                    table: table.into(),
                    trend: t.trend,
                    from,
                    to,
                });
            }
        }

        Ok(())
    }
}

fn extended_ratio_table() -> BandTable {
    BandTable::new(
        Trend::Decreasing,
        vec![
            Band::new(Bound::Below(0.15), 10, "Exceptional"),
            Band::new(Bound::Below(0.30), 8, "Outstanding"),
            Band::new(Bound::Below(0.50), 6, "Strong"),
            Band::new(Bound::Below(0.70), 4, "Moderate"),
            Band::new(Bound::Below(0.85), 2, "Slight edge"),
        ],
        0,
        "No dry-up",
    )
}

fn obv_table(five: i32, four: i32, three: i32) -> BandTable {
    BandTable::new(
        Trend::Increasing,
        vec![
            Band::new(Bound::AtLeast(5.0), five, "Excellent"),
            Band::new(Bound::AtLeast(4.0), four, "Good"),
            Band::new(Bound::AtLeast(3.0), three, "Moderate"),
        ],
        0,
        "Weak",
    )
}

fn rs_slope_table(strong: i32, moderate: i32, slight: i32) -> BandTable {
    BandTable::new(
        Trend::Increasing,
        vec![
            Band::new(Bound::Above(0.005), strong, "Strongly positive"),
            Band::new(Bound::Above(0.002), moderate, "Moderately positive"),
            Band::new(Bound::Above(0.0), slight, "Slightly positive"),
        ],
        0,
        "Negative/flat",
    )
}
