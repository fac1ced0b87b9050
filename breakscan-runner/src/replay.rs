//! Historical replay: score a ticker at dates leading up to a known event.
//!
//! Each evaluation sees only bars dated on or before its scan date. A
//! replay file lists the events (known breakouts) and how to sample dates
//! before them:
//!
//! ```toml
//! [settings]
//! offsets = [14, 10, 7, 3, 0]   # calendar days before the event
//! # window_days = 20            # or: every day for N days before it
//! min_tier = "watch_list"
//!
//! [[case]]
//! ticker = "CVNA"
//! event_date = "2025-11-21"
//! peak_price = 472.0
//! note = "52.8% gain in 3 weeks"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use breakscan_core::data::SeriesProvider;
use breakscan_core::{evaluate, AlertTier, CompositeResult, ScanConfig, Series};

use crate::scanner::fetch_window_days;

/// Longest run-up a replay may sample, in calendar days before the event.
pub const MAX_REPLAY_DAYS: u32 = 3_650;

/// Result of evaluating one ticker at one historical date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplayOutcome {
    Evaluated(Box<CompositeResult>),
    /// Fewer than `scan.min_bars` bars on or before the date.
    InsufficientData { bars: usize },
}

impl ReplayOutcome {
    pub fn result(&self) -> Option<&CompositeResult> {
        match self {
            ReplayOutcome::Evaluated(r) => Some(r),
            ReplayOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Evaluate `series` as it looked at the close of `as_of`.
///
/// Both inputs are truncated to bars dated on or before `as_of`, so no
/// later bar can influence the score.
pub fn replay_at(series: &Series, benchmark: Option<&Series>, as_of: NaiveDate, config: &ScanConfig) -> ReplayOutcome {
    let Some(visible) = series.truncate_at(as_of) else {
        return ReplayOutcome::InsufficientData { bars: 0 };
    };
    if visible.len() < config.scan.min_bars {
        return ReplayOutcome::InsufficientData { bars: visible.len() };
    }
    let benchmark = benchmark.and_then(|b| b.truncate_at(as_of));
    ReplayOutcome::Evaluated(Box::new(evaluate(&visible, benchmark.as_ref(), config)))
}

/// A known event to replay towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayCase {
    pub ticker: String,
    pub event_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Highest price reached after the event, for the potential-gain figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Calendar days before the event to scan on.
    pub offsets: Vec<u32>,
    /// When set, scan every day from `event - window_days` to the event instead.
    pub window_days: Option<u32>,
    /// Lowest tier that counts as a catch.
    pub min_tier: AlertTier,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            offsets: vec![14, 10, 7, 3, 0],
            window_days: None,
            min_tier: AlertTier::WatchList,
        }
    }
}

impl ReplaySettings {
    /// Scan dates for an event, ascending and de-duplicated.
    ///
    /// Offsets are capped at [`MAX_REPLAY_DAYS`].
    pub fn scan_dates(&self, event: NaiveDate) -> Vec<NaiveDate> {
        let before = |d: u32| event.checked_sub_signed(Duration::days(i64::from(d.min(MAX_REPLAY_DAYS))));
        let mut dates: Vec<NaiveDate> = match self.window_days {
            Some(n) => (0..=n.min(MAX_REPLAY_DAYS)).filter_map(before).collect(),
            None => self.offsets.iter().filter_map(|&d| before(d)).collect(),
        };
        dates.sort();
        dates.dedup();
        dates
    }

    /// Whether a result counts as a catch at this setting.
    ///
    /// A signal-count trigger counts at watch-list level.
    pub fn is_catch(&self, result: &CompositeResult) -> bool {
        result.tier() >= self.min_tier || (self.min_tier <= AlertTier::WatchList && result.is_alert())
    }
}

/// Contents of a replay TOML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplayFile {
    #[serde(default)]
    pub settings: ReplaySettings,
    #[serde(default, rename = "case")]
    pub cases: Vec<ReplayCase>,
}

impl ReplayFile {
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ReplayFile = toml::from_str(content).context("failed to parse replay cases")?;
        if file.cases.is_empty() {
            anyhow::bail!("replay file defines no [[case]] entries");
        }
        if file.settings.window_days.is_none() && file.settings.offsets.is_empty() {
            anyhow::bail!("replay settings need offsets or window_days");
        }
        if let Some(days) = file.settings.window_days.filter(|&d| d > MAX_REPLAY_DAYS) {
            anyhow::bail!("window_days = {days} exceeds the {MAX_REPLAY_DAYS}-day limit");
        }
        if let Some(days) = file.settings.offsets.iter().copied().find(|&d| d > MAX_REPLAY_DAYS) {
            anyhow::bail!("offset {days} exceeds the {MAX_REPLAY_DAYS}-day limit");
        }
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid replay file {}", path.display()))
    }
}

/// One sampled date in a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayPoint {
    pub date: NaiveDate,
    /// Calendar days until the event (0 on the event date).
    pub days_before: i64,
    pub outcome: ReplayOutcome,
}

/// Scores over the run-up to one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTimeline {
    pub case: ReplayCase,
    pub points: Vec<ReplayPoint>,
    /// Earliest date that counted as a catch.
    pub first_alert: Option<NaiveDate>,
    /// Calendar days between `first_alert` and the event.
    pub lead_days: Option<i64>,
    pub entry_price: Option<f64>,
    /// Percent move from the first-alert close to the case's peak price.
    pub potential_gain_pct: Option<f64>,
}

impl ReplayTimeline {
    pub fn caught(&self) -> bool {
        self.first_alert.is_some()
    }

    pub fn best_total(&self) -> Option<u32> {
        self.points.iter().filter_map(|p| p.outcome.result()).map(|r| r.total()).max()
    }

    pub fn most_signals(&self) -> Option<u32> {
        self.points
            .iter()
            .filter_map(|p| p.outcome.result())
            .map(|r| r.score.signals_met)
            .max()
    }
}

/// Build a timeline from an already-loaded series.
pub fn replay_series(
    case: &ReplayCase,
    series: Option<&Series>,
    benchmark: Option<&Series>,
    settings: &ReplaySettings,
    config: &ScanConfig,
) -> ReplayTimeline {
    let points: Vec<ReplayPoint> = settings
        .scan_dates(case.event_date)
        .into_iter()
        .map(|date| ReplayPoint {
            date,
            days_before: (case.event_date - date).num_days(),
            outcome: match series {
                Some(s) => replay_at(s, benchmark, date, config),
                None => ReplayOutcome::InsufficientData { bars: 0 },
            },
        })
        .collect();

    let first = points
        .iter()
        .find_map(|p| p.outcome.result().filter(|r| settings.is_catch(r)).map(|r| (p.date, r.current_price)));

    let (first_alert, entry_price) = match first {
        Some((date, price)) => (Some(date), Some(price)),
        None => (None, None),
    };
    let potential_gain_pct = match (entry_price, case.peak_price) {
        (Some(entry), Some(peak)) if entry > 0.0 => Some((peak - entry) / entry * 100.0),
        _ => None,
    };

    ReplayTimeline {
        case: case.clone(),
        points,
        first_alert,
        lead_days: first_alert.map(|d| (case.event_date - d).num_days()),
        entry_price,
        potential_gain_pct,
    }
}

/// Fetch history for a case and replay it.
///
/// A fetch failure leaves every point as insufficient data; it never
/// aborts the remaining cases.
pub fn replay_case(
    provider: &dyn SeriesProvider,
    case: &ReplayCase,
    benchmark: Option<&Series>,
    settings: &ReplaySettings,
    config: &ScanConfig,
) -> ReplayTimeline {
    let (start, end) = history_range(std::slice::from_ref(case), settings, config);
    let series = match provider.fetch(&case.ticker, start, end) {
        Ok(fetched) => Some(fetched.series),
        Err(e) => {
            warn!(ticker = %case.ticker, error = %e, "replay history unavailable");
            None
        }
    };
    replay_series(case, series.as_ref(), benchmark, settings, config)
}

/// Replay every case in a file, fetching the benchmark once.
pub fn run_replay(provider: &dyn SeriesProvider, file: &ReplayFile, config: &ScanConfig) -> ReplayReport {
    let (start, end) = history_range(&file.cases, &file.settings, config);
    let benchmark = match provider.fetch(&config.scan.benchmark, start, end) {
        Ok(fetched) => Some(fetched.series),
        Err(e) => {
            warn!(benchmark = %config.scan.benchmark, error = %e, "benchmark unavailable for replay");
            None
        }
    };

    let timelines: Vec<ReplayTimeline> = file
        .cases
        .iter()
        .map(|case| replay_case(provider, case, benchmark.as_ref(), &file.settings, config))
        .collect();
    let summary = ReplaySummary::from_timelines(&timelines);

    info!(
        cases = summary.cases,
        caught = summary.caught,
        catch_rate = summary.catch_rate,
        "replay complete"
    );
    ReplayReport { timelines, summary }
}

/// Date range covering every case's scan dates plus the indicator warm-up.
fn history_range(cases: &[ReplayCase], settings: &ReplaySettings, config: &ScanConfig) -> (NaiveDate, NaiveDate) {
    let dates: Vec<NaiveDate> = cases.iter().flat_map(|c| settings.scan_dates(c.event_date)).collect();
    let earliest = dates.iter().min().copied().unwrap_or_default();
    let latest = dates.iter().max().copied().unwrap_or_default();
    let start = earliest
        .checked_sub_signed(Duration::days(i64::from(fetch_window_days(config))))
        .unwrap_or(NaiveDate::MIN);
    (start, latest)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub timelines: Vec<ReplayTimeline>,
    pub summary: ReplaySummary,
}

/// Aggregate catch statistics over many cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub cases: usize,
    pub caught: usize,
    /// Percent of cases caught.
    pub catch_rate: f64,
    pub mean_lead_days: Option<f64>,
    pub best_lead_days: Option<i64>,
}

impl ReplaySummary {
    pub fn from_timelines(timelines: &[ReplayTimeline]) -> Self {
        let leads: Vec<i64> = timelines.iter().filter_map(|t| t.lead_days).collect();
        let cases = timelines.len();
        let caught = leads.len();
        Self {
            cases,
            caught,
            catch_rate: if cases > 0 {
                caught as f64 / cases as f64 * 100.0
            } else {
                0.0
            },
            mean_lead_days: if caught > 0 {
                Some(leads.iter().sum::<i64>() as f64 / caught as f64)
            } else {
                None
            },
            best_lead_days: leads.iter().max().copied(),
        }
    }
}
