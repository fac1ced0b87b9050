//! Scan configuration.
//!
//! One immutable [`ScanConfig`] value is threaded through every extractor,
//! the scoring engine, the orchestrator and the replay harness. Every field
//! has a default, so a TOML file only needs the values it overrides. The
//! `policy` key takes either a preset name or a full policy table.

use crate::scoring::{PolicyError, ScoringPolicy};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Trailing window for the red/green volume partition.
    pub lookback: usize,
    pub ema_period: usize,
    /// Bars required beyond `lookback`.
    pub min_bars_extra: usize,
    /// Recent bars checked against the EMA.
    pub above_ma_window: usize,
    /// Of those, how many must close above it.
    pub above_ma_required: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            ema_period: 21,
            min_bars_extra: 5,
            above_ma_window: 3,
            above_ma_required: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub rsi_period: usize,
    /// Window for the RSI and price slopes.
    pub slope_lookback: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Day-over-day OBV changes counted for the rising-days metric.
    pub obv_window: usize,
    pub min_bars: usize,
    /// Largest histogram value still classed as freshly positive.
    pub macd_fresh_max: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            slope_lookback: 5,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            obv_window: 5,
            min_bars: 30,
            macd_fresh_max: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeStrengthConfig {
    pub lookback: usize,
    pub min_bars_extra: usize,
    pub extended_window: usize,
    pub recent_window: usize,
}

impl Default for RelativeStrengthConfig {
    fn default() -> Self {
        Self {
            lookback: 5,
            min_bars_extra: 5,
            extended_window: 20,
            recent_window: 3,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub benchmark: String,
    /// Calendar days of history requested per ticker.
    pub data_lookback_days: u32,
    /// Tickers with fewer bars are skipped before evaluation.
    pub min_bars: usize,
    /// Liquidity floor on mean daily volume; 0 disables it.
    pub min_avg_volume: f64,
    pub liquidity_window: usize,
    /// Keep only the top N results; 0 keeps all.
    pub max_results: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            benchmark: "SPY".into(),
            data_lookback_days: 60,
            min_bars: 30,
            min_avg_volume: 0.0,
            liquidity_window: 20,
            max_results: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    pub scan: ScanSettings,
    pub volume: VolumeConfig,
    pub momentum: MomentumConfig,
    pub relative_strength: RelativeStrengthConfig,
    #[serde(deserialize_with = "deserialize_policy")]
    pub policy: ScoringPolicy,
}

impl ScanConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Default settings with a different scoring policy.
    pub fn with_policy(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Longest history any extractor can use, in bars.
    pub fn bars_needed(&self) -> usize {
        let m = &self.momentum;
        [
            self.scan.min_bars,
            m.min_bars,
            m.macd_slow + m.macd_signal,
            m.rsi_period + m.slope_lookback,
            self.volume.lookback + self.volume.min_bars_extra,
            self.volume.ema_period,
            self.relative_strength.lookback + self.relative_strength.min_bars_extra,
            self.relative_strength.extended_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("volume.lookback", self.volume.lookback),
            ("volume.ema_period", self.volume.ema_period),
            ("volume.above_ma_window", self.volume.above_ma_window),
            ("momentum.rsi_period", self.momentum.rsi_period),
            ("momentum.slope_lookback", self.momentum.slope_lookback),
            ("momentum.macd_fast", self.momentum.macd_fast),
            ("momentum.macd_slow", self.momentum.macd_slow),
            ("momentum.macd_signal", self.momentum.macd_signal),
            ("momentum.obv_window", self.momentum.obv_window),
            ("relative_strength.lookback", self.relative_strength.lookback),
            ("relative_strength.extended_window", self.relative_strength.extended_window),
            ("relative_strength.recent_window", self.relative_strength.recent_window),
            ("scan.liquidity_window", self.scan.liquidity_window),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be >= 1"));
            }
        }

        if self.momentum.macd_fast >= self.momentum.macd_slow {
            return Err(invalid("momentum.macd_fast", "must be below macd_slow"));
        }
        if self.volume.above_ma_required > self.volume.above_ma_window {
            return Err(invalid("volume.above_ma_required", "must not exceed above_ma_window"));
        }
        if !(self.momentum.macd_fresh_max.is_finite() && self.momentum.macd_fresh_max >= 0.0) {
            return Err(invalid("momentum.macd_fresh_max", "must be finite and >= 0"));
        }
        if !(self.scan.min_avg_volume.is_finite() && self.scan.min_avg_volume >= 0.0) {
            return Err(invalid("scan.min_avg_volume", "must be finite and >= 0"));
        }
        if self.scan.benchmark.trim().is_empty() {
            return Err(invalid("scan.benchmark", "must not be empty"));
        }

        self.policy.validate()?;
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

fn deserialize_policy<'de, D>(deserializer: D) -> Result<ScoringPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PolicyRepr {
        Preset(String),
        Full(ScoringPolicy),
    }

    match PolicyRepr::deserialize(deserializer)? {
        PolicyRepr::Preset(name) => ScoringPolicy::preset(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown scoring policy preset '{name}'"))),
        PolicyRepr::Full(policy) => Ok(policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn default_values_match_documented_constants() {
        let c = ScanConfig::default();
        assert_eq!(c.volume.lookback, 20);
        assert_eq!(c.volume.ema_period, 21);
        assert_eq!(c.momentum.rsi_period, 14);
        assert_eq!((c.momentum.macd_fast, c.momentum.macd_slow, c.momentum.macd_signal), (12, 26, 9));
        assert_eq!(c.relative_strength.lookback, 5);
        assert_eq!(c.scan.benchmark, "SPY");
        assert_eq!(c.policy.name, "extended");
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ScanConfig::from_toml("").unwrap(), ScanConfig::default());
    }

    #[test]
    fn partial_override() {
        let c = ScanConfig::from_toml(
            r#"
            policy = "basic"

            [volume]
            lookback = 30

            [scan]
            benchmark = "QQQ"
            min_avg_volume = 250000.0
            "#,
        )
        .unwrap();
        assert_eq!(c.volume.lookback, 30);
        assert_eq!(c.volume.ema_period, 21);
        assert_eq!(c.scan.benchmark, "QQQ");
        assert_eq!(c.scan.min_avg_volume, 250_000.0);
        assert_eq!(c.policy, ScoringPolicy::basic());
    }

    #[test]
    fn unknown_preset_rejected() {
        let err = ScanConfig::from_toml("policy = \"yolo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_round_trip() {
        for preset in crate::scoring::PolicyPreset::ALL {
            let config = ScanConfig::with_policy(ScoringPolicy::from_preset(preset));
            let text = config.to_toml().unwrap();
            let back = ScanConfig::from_toml(&text).unwrap();
            assert_eq!(back, config, "round trip failed for {}", preset.name());
        }
    }

    #[test]
    fn macd_fast_must_be_below_slow() {
        let mut c = ScanConfig::default();
        c.momentum.macd_fast = 26;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_period_rejected() {
        let err = ScanConfig::from_toml("[momentum]\nrsi_period = 0").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "momentum.rsi_period"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn invalid_policy_surfaces() {
        let mut c = ScanConfig::default();
        c.policy.volume.ratio.bands[0].points = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn fingerprint_tracks_values() {
        let a = ScanConfig::default();
        let mut b = ScanConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.relative_strength.lookback = 6;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn bars_needed_covers_slowest_indicator() {
        let c = ScanConfig::default();
        assert_eq!(c.bars_needed(), 35);
    }
}
