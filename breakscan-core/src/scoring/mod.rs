//! Scoring: breakpoint tables, policies, the engine and alert tiers.

pub mod bands;
pub mod engine;
pub mod policy;
pub mod tier;

pub use bands::{Band, BandMatch, BandTable, Bound, Trend};
pub use engine::{score, Category, CategoryScore, ScoreCard, ScoreComponent};
pub use policy::{
    MacdPoints, MomentumPolicy, PolicyError, PolicyPreset, RelativeStrengthPolicy, ScoringPolicy, VolumePolicy,
};
pub use tier::{AlertTier, TierThresholds};
