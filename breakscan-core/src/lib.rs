//! Breakscan Core: indicators, metric extractors, scoring, and data sources.
//!
//! This crate contains everything needed to score one ticker:
//! - Domain types (bars, validated series)
//! - Indicator library (EMA, RSI, MACD, OBV, OLS slope)
//! - Volume, momentum, and relative-strength extractors
//! - Pluggable point-based scoring policies and alert tiers
//! - Composite evaluation of a series against a benchmark
//! - Data providers (Yahoo, CSV), parquet cache, ticker universes
//!
//! Evaluation is pure: the same series, benchmark, and config always produce
//! the same [`CompositeResult`], including its fingerprint.

pub mod composite;
pub mod config;
pub mod data;
pub mod domain;
pub mod extract;
pub mod indicators;
pub mod scoring;

pub use composite::{evaluate, CompositeResult};
pub use config::{ConfigError, ScanConfig};
pub use domain::{Bar, Series, SeriesError};
pub use scoring::{AlertTier, PolicyPreset, ScoringPolicy};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the scanner shares across worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();

        // Config and policy
        require_send::<config::ScanConfig>();
        require_sync::<config::ScanConfig>();
        require_send::<scoring::ScoringPolicy>();
        require_sync::<scoring::ScoringPolicy>();
        require_send::<scoring::BandTable>();
        require_sync::<scoring::BandTable>();

        // Results
        require_send::<extract::VolumeMetrics>();
        require_sync::<extract::VolumeMetrics>();
        require_send::<extract::MomentumMetrics>();
        require_sync::<extract::MomentumMetrics>();
        require_send::<extract::RelativeStrengthMetrics>();
        require_sync::<extract::RelativeStrengthMetrics>();
        require_send::<scoring::ScoreCard>();
        require_sync::<scoring::ScoreCard>();
        require_send::<composite::CompositeResult>();
        require_sync::<composite::CompositeResult>();

        // Data sources
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::ParquetCache>();
        require_sync::<data::ParquetCache>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
    }

    /// The indicator trait stays object-safe so indicators can be boxed.
    #[test]
    fn indicator_trait_is_object_safe() {
        let boxed: Vec<Box<dyn indicators::Indicator>> = vec![
            Box::new(indicators::Ema::new(21)),
            Box::new(indicators::Rsi::new(14)),
            Box::new(indicators::Obv),
        ];
        let names: Vec<&str> = boxed.iter().map(|i| i.name()).collect();
        assert_eq!(names.len(), 3);
    }
}
