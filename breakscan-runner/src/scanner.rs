//! Scan orchestration: fetch, gate, evaluate and rank a ticker list.
//!
//! The benchmark is fetched once per scan and shared read-only across the
//! per-ticker evaluations, which run in parallel on the rayon pool. A
//! ticker that cannot be evaluated is recorded in [`ScanReport::skipped`]
//! and never aborts the scan.

use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use breakscan_core::data::{DataSource, SeriesProvider};
use breakscan_core::{evaluate, AlertTier, CompositeResult, ScanConfig, Series};

/// Current schema version for persisted scan reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Why a ticker was left out of the ranked results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The provider returned an error or nothing usable.
    Unavailable { reason: String },
    /// Fewer bars than `scan.min_bars`.
    TooShort { bars: usize, required: usize },
    /// Mean volume under the liquidity floor.
    Illiquid { avg_volume: f64, floor: f64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unavailable { reason } => write!(f, "unavailable: {reason}"),
            SkipReason::TooShort { bars, required } => write!(f, "too short: {bars} bars (need {required})"),
            SkipReason::Illiquid { avg_volume, floor } => {
                write!(f, "illiquid: avg volume {avg_volume:.0} below {floor:.0}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skip {
    pub ticker: String,
    pub reason: SkipReason,
}

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub as_of: NaiveDate,
    pub policy: String,
    /// Sorted by total score descending, then ticker ascending.
    pub results: Vec<CompositeResult>,
    pub skipped: Vec<Skip>,
    /// Tickers requested.
    pub scanned: usize,
    pub duration_ms: u64,
    pub config_fingerprint: String,
    pub benchmark: String,
    pub benchmark_available: bool,
    /// Tickers evaluated on generated data.
    #[serde(default)]
    pub synthetic: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ScanReport {
    /// Results worth surfacing: any tier above skip, or a signal-count trigger.
    pub fn alerts(&self) -> Vec<&CompositeResult> {
        self.results
            .iter()
            .filter(|r| r.tier() > AlertTier::Skip || r.is_alert())
            .collect()
    }

    pub fn by_tier(&self, tier: AlertTier) -> Vec<&CompositeResult> {
        self.results.iter().filter(|r| r.tier() == tier).collect()
    }

    pub fn has_synthetic(&self) -> bool {
        !self.synthetic.is_empty()
    }
}

/// Calendar days requested per ticker: the configured lookback, widened so
/// the slowest indicator still has enough trading days.
pub fn fetch_window_days(config: &ScanConfig) -> u32 {
    let bars = config.bars_needed() as u32;
    let calendar = bars.saturating_mul(7).div_ceil(5) + 10;
    config.scan.data_lookback_days.max(calendar)
}

/// Runs scans against a provider with one immutable configuration.
pub struct Scanner<P> {
    config: ScanConfig,
    provider: P,
}

impl<P: SeriesProvider> Scanner<P> {
    pub fn new(config: ScanConfig, provider: P) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch the configured benchmark ending at `as_of`.
    ///
    /// `None` when the provider cannot supply it; relative strength then
    /// falls back to its sentinel metrics for every ticker.
    pub fn fetch_benchmark(&self, as_of: NaiveDate) -> Option<Series> {
        let symbol = &self.config.scan.benchmark;
        match self.provider.fetch_recent(symbol, as_of, fetch_window_days(&self.config)) {
            Ok(fetched) => fetched.series.truncate_at(as_of),
            Err(e) => {
                warn!(benchmark = %symbol, error = %e, "benchmark unavailable; relative strength will use sentinels");
                None
            }
        }
    }

    /// Scan every ticker as of `as_of`.
    pub fn scan(&self, tickers: &[String], as_of: NaiveDate) -> ScanReport {
        let started = Instant::now();
        info!(tickers = tickers.len(), %as_of, policy = %self.config.policy.name, "scan started");

        let benchmark = self.fetch_benchmark(as_of);

        let outcomes: Vec<(String, Result<(CompositeResult, DataSource), SkipReason>)> = tickers
            .par_iter()
            .map(|ticker| {
                let _span = info_span!("evaluate", ticker = %ticker).entered();
                (ticker.clone(), self.scan_one(ticker, as_of, benchmark.as_ref()))
            })
            .collect();

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut synthetic = Vec::new();
        for (ticker, outcome) in outcomes {
            match outcome {
                Ok((result, source)) => {
                    if source == DataSource::Synthetic {
                        synthetic.push(ticker);
                    }
                    results.push(result);
                }
                Err(reason) => {
                    warn!(ticker = %ticker, %reason, "skipped");
                    skipped.push(Skip { ticker, reason });
                }
            }
        }

        rank(&mut results);
        if self.config.scan.max_results > 0 {
            results.truncate(self.config.scan.max_results);
        }

        let report = ScanReport {
            schema_version: SCHEMA_VERSION,
            as_of,
            policy: self.config.policy.name.clone(),
            results,
            skipped,
            scanned: tickers.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            config_fingerprint: self.config.fingerprint(),
            benchmark: self.config.scan.benchmark.clone(),
            benchmark_available: benchmark.is_some(),
            synthetic,
        };

        info!(
            evaluated = report.results.len(),
            skipped = report.skipped.len(),
            alerts = report.alerts().len(),
            duration_ms = report.duration_ms,
            "scan complete"
        );
        report
    }

    fn scan_one(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        benchmark: Option<&Series>,
    ) -> Result<(CompositeResult, DataSource), SkipReason> {
        let fetched = self
            .provider
            .fetch_recent(ticker, as_of, fetch_window_days(&self.config))
            .map_err(|e| SkipReason::Unavailable { reason: e.to_string() })?;

        let series = fetched.series.truncate_at(as_of).ok_or_else(|| SkipReason::Unavailable {
            reason: format!("no bars on or before {as_of}"),
        })?;

        let required = self.config.scan.min_bars;
        if series.len() < required {
            return Err(SkipReason::TooShort {
                bars: series.len(),
                required,
            });
        }

        let floor = self.config.scan.min_avg_volume;
        if floor > 0.0 {
            let avg_volume = series.avg_volume(self.config.scan.liquidity_window);
            if avg_volume < floor {
                return Err(SkipReason::Illiquid { avg_volume, floor });
            }
        }

        let result = evaluate(&series, benchmark, &self.config);
        debug!(
            total = result.total(),
            tier = result.tier().as_str(),
            signals = result.score.signals_met,
            "evaluated"
        );
        Ok((result, fetched.source))
    }
}

/// Total score descending, ticker ascending.
pub fn rank(results: &mut [CompositeResult]) {
    results.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.ticker.cmp(&b.ticker)));
}
