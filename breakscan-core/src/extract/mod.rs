//! Metric extractors.
//!
//! Each extractor turns a series (and, for relative strength, a benchmark)
//! into one immutable metric set. Failure is a value, not an error: an
//! extractor returns [`Extraction::InsufficientData`] or
//! [`Extraction::Failed`] and the caller falls back to the metric set's
//! sentinel, so scoring always sees the same shape.

pub mod momentum;
pub mod relative_strength;
pub mod volume;

pub use momentum::{extract_momentum, MacdState, MomentumMetrics, RsiZone};
pub use relative_strength::{extract_relative_strength, RelativeStrengthMetrics};
pub use volume::{extract_volume, VolumeMetrics};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric set with a documented fallback.
pub trait MetricSet: Clone {
    /// Fallback values used when the metrics could not be computed.
    fn sentinel() -> Self;

    /// Name of the first non-finite numeric field, if any.
    fn non_finite_field(&self) -> Option<&'static str>;
}

/// Why an extractor could not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortfall {
    /// The input series is shorter than the extractor's minimum window.
    Bars { required: usize, available: usize },
    /// No benchmark series was supplied.
    MissingBenchmark,
    /// Too few dates shared by the ticker and the benchmark.
    AlignedRows { required: usize, available: usize },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::Bars { required, available } => {
                write!(f, "insufficient data: {available} bars, need {required}")
            }
            Shortfall::MissingBenchmark => f.write_str("missing benchmark data"),
            Shortfall::AlignedRows { required, available } => write!(
                f,
                "insufficient aligned data: {available} shared dates, need {required}"
            ),
        }
    }
}

/// Outcome of one extractor run.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<M> {
    Computed(M),
    InsufficientData(Shortfall),
    Failed { reason: String },
}

impl<M: MetricSet> Extraction<M> {
    /// Wrap freshly computed metrics, demoting any non-finite value to `Failed`.
    pub fn checked(metrics: M) -> Self {
        match metrics.non_finite_field() {
            Some(field) => Extraction::Failed {
                reason: format!("non-finite {field}"),
            },
            None => Extraction::Computed(metrics),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Extraction::Computed(_))
    }

    /// Metrics for scoring plus the status marker, substituting the sentinel on failure.
    pub fn into_report(self) -> CategoryReport<M> {
        match self {
            Extraction::Computed(metrics) => CategoryReport {
                metrics,
                status: ExtractionStatus::Computed,
            },
            Extraction::InsufficientData(shortfall) => CategoryReport {
                metrics: M::sentinel(),
                status: ExtractionStatus::InsufficientData { shortfall },
            },
            Extraction::Failed { reason } => CategoryReport {
                metrics: M::sentinel(),
                status: ExtractionStatus::Failed { reason },
            },
        }
    }
}

/// Serializable status marker kept beside the metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Computed,
    InsufficientData { shortfall: Shortfall },
    Failed { reason: String },
}

impl ExtractionStatus {
    pub fn is_computed(&self) -> bool {
        matches!(self, ExtractionStatus::Computed)
    }

    /// Short marker for tabular output: empty when computed.
    pub fn marker(&self) -> String {
        match self {
            ExtractionStatus::Computed => String::new(),
            ExtractionStatus::InsufficientData { shortfall } => shortfall.to_string(),
            ExtractionStatus::Failed { reason } => format!("error: {reason}"),
        }
    }
}

/// One category's metrics as handed to scoring and reporting.
///
/// `metrics` is always populated; it holds the sentinel set whenever
/// `status` is not `Computed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport<M> {
    pub metrics: M,
    #[serde(flatten)]
    pub status: ExtractionStatus,
}

/// First non-finite entry among named values.
pub(crate) fn first_non_finite(fields: &[(&'static str, f64)]) -> Option<&'static str> {
    fields.iter().find(|(_, v)| !v.is_finite()).map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_demotes_nan() {
        let mut m = VolumeMetrics::sentinel();
        m.red_volume_ratio = f64::NAN;
        match Extraction::checked(m) {
            Extraction::Failed { reason } => assert!(reason.contains("red_volume_ratio")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn report_substitutes_sentinel() {
        let report: CategoryReport<MomentumMetrics> =
            Extraction::InsufficientData(Shortfall::Bars { required: 30, available: 10 }).into_report();
        assert_eq!(report.metrics, MomentumMetrics::sentinel());
        assert!(!report.status.is_computed());
        assert_eq!(report.status.marker(), "insufficient data: 10 bars, need 30");
    }

    #[test]
    fn failed_report_keeps_reason() {
        let report: CategoryReport<RelativeStrengthMetrics> = Extraction::Failed {
            reason: "non-finite rs_slope".into(),
        }
        .into_report();
        assert_eq!(report.metrics, RelativeStrengthMetrics::sentinel());
        assert_eq!(report.status.marker(), "error: non-finite rs_slope");
    }

    #[test]
    fn status_serializes_with_tag() {
        let status = ExtractionStatus::InsufficientData {
            shortfall: Shortfall::MissingBenchmark,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["shortfall"]["kind"], "missing_benchmark");
    }
}
