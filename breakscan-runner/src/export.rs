//! Reporting and export: CSV, JSON, Markdown and text artifact generation.
//!
//! Provides four export formats for scan results:
//! - **CSV**: one row per ticker in a fixed column order, for spreadsheets
//! - **JSON**: full round-trip serialization of a [`ScanReport`] with schema versioning
//! - **Markdown**: ranked summary table
//! - **Text**: per-alert detailed breakdown with the scoring labels
//!
//! Persisted JSON carries a `schema_version` field. Newer versions are
//! rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use breakscan_core::extract::RsiZone;
use breakscan_core::scoring::CategoryScore;
use breakscan_core::{AlertTier, CompositeResult};

use crate::replay::{ReplayOutcome, ReplayTimeline};
use crate::scanner::{ScanReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ScanReport` to pretty JSON.
pub fn export_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

/// Deserialize a `ScanReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<ScanReport> {
    let report: ScanReport = serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// CSV header, in output order.
pub const CSV_COLUMNS: [&str; 22] = [
    "ticker",
    "date",
    "current_price",
    "volume",
    "total_score",
    "alert_tier",
    "alert_triggered",
    "signals_met",
    "volume_score",
    "momentum_score",
    "rs_score",
    "red_volume_ratio",
    "price_above_ma",
    "rsi_current",
    "rsi_slope",
    "macd_histogram",
    "obv_days_rising",
    "rs_slope",
    "outperformance",
    "volume_status",
    "momentum_status",
    "rs_status",
];

/// Export composite results as CSV with one row per ticker.
///
/// The status columns are empty for categories computed from real data
/// and describe the shortfall or failure otherwise.
pub fn export_results_csv(results: &[CompositeResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_COLUMNS)?;

    for r in results {
        let v = &r.volume.metrics;
        let m = &r.momentum.metrics;
        let rs = &r.relative_strength.metrics;
        wtr.write_record([
            r.ticker.clone(),
            r.as_of.to_string(),
            format!("{:.2}", r.current_price),
            r.current_volume.to_string(),
            r.score.total.to_string(),
            r.score.tier.as_str().to_string(),
            r.score.alert_triggered.to_string(),
            r.score.signals_met.to_string(),
            r.score.volume.points.to_string(),
            r.score.momentum.points.to_string(),
            r.score.relative_strength.points.to_string(),
            format!("{:.4}", v.red_volume_ratio),
            v.price_above_ma.to_string(),
            format!("{:.2}", m.rsi_current),
            format!("{:.4}", m.rsi_slope),
            format!("{:.4}", m.macd_histogram),
            m.obv_days_rising.to_string(),
            format!("{:.6}", rs.rs_slope),
            format!("{:.2}", rs.outperformance),
            r.volume.status.marker(),
            r.momentum.status.marker(),
            r.relative_strength.status.marker(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export replay timelines as CSV, one row per sampled date.
pub fn export_replay_csv(timelines: &[ReplayTimeline]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "ticker",
        "event_date",
        "scan_date",
        "days_before",
        "status",
        "total_score",
        "alert_tier",
        "signals_met",
        "current_price",
        "first_alert",
    ])?;

    for t in timelines {
        let first_alert = t.first_alert.map(|d| d.to_string()).unwrap_or_default();
        for p in &t.points {
            let (status, total, tier, signals, price) = match &p.outcome {
                ReplayOutcome::Evaluated(r) => (
                    "evaluated".to_string(),
                    r.total().to_string(),
                    r.tier().as_str().to_string(),
                    r.score.signals_met.to_string(),
                    format!("{:.2}", r.current_price),
                ),
                ReplayOutcome::InsufficientData { bars } => (
                    format!("insufficient_data ({bars} bars)"),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ),
            };
            wtr.write_record([
                t.case.ticker.clone(),
                t.case.event_date.to_string(),
                p.date.to_string(),
                p.days_before.to_string(),
                status,
                total,
                tier,
                signals,
                price,
                first_alert.clone(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a scan.
///
/// Creates a directory named `scan_{as_of}_{timestamp}/` under `output_dir`
/// containing:
/// - `report.json`: the full `ScanReport`
/// - `results.csv`: one row per evaluated ticker
/// - `report.md`: ranked summary
/// - `alerts.txt`: detailed breakdown, only when something alerted
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &ScanReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "scan_{}_{}",
        report.as_of.format("%Y%m%d"),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("results.csv"), export_results_csv(&report.results)?)?;
    std::fs::write(run_dir.join("report.md"), generate_markdown(report))?;
    if let Some(text) = detailed_report(report) {
        std::fs::write(run_dir.join("alerts.txt"), text)?;
    }

    Ok(run_dir)
}

/// Load a `ScanReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<ScanReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown summary for a scan.
pub fn generate_markdown(report: &ScanReport) -> String {
    let mut md = String::with_capacity(2048);
    let alerts = report.alerts();

    md.push_str("# Breakout Scan Report\n\n");

    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| As of | {} |\n", report.as_of));
    md.push_str(&format!("| Policy | {} |\n", report.policy));
    md.push_str(&format!(
        "| Scanned | {} ({} evaluated, {} skipped) |\n",
        report.scanned,
        report.results.len(),
        report.skipped.len()
    ));
    md.push_str(&format!(
        "| Alerts | {} ({} high priority, {} watch list) |\n",
        alerts.len(),
        report.by_tier(AlertTier::HighPriority).len(),
        report.by_tier(AlertTier::WatchList).len()
    ));
    md.push_str(&format!(
        "| Benchmark | {}{} |\n",
        report.benchmark,
        if report.benchmark_available { "" } else { " (unavailable)" }
    ));
    md.push_str(&format!("| Duration | {} ms |\n", report.duration_ms));
    md.push_str(&format!("| Config | `{}` |\n", short_hash(&report.config_fingerprint)));
    if report.has_synthetic() {
        md.push_str(&format!("| Data | **SYNTHETIC** ({}) |\n", report.synthetic.join(", ")));
    }
    md.push('\n');

    md.push_str("## Results\n\n");
    if report.results.is_empty() {
        md.push_str("No tickers evaluated.\n\n");
    } else {
        md.push_str("| # | Ticker | Price | Total | Tier | Signals | Volume | Momentum | RS |\n");
        md.push_str("| ---: | --- | ---: | ---: | --- | ---: | ---: | ---: | ---: |\n");
        for (i, r) in report.results.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {}/{} | {} | {}/3 | {} | {} | {} |\n",
                i + 1,
                r.ticker,
                r.current_price,
                r.score.total,
                r.score.max_total,
                r.tier().as_str(),
                r.score.signals_met,
                category_cell(&r.score.volume),
                category_cell(&r.score.momentum),
                category_cell(&r.score.relative_strength),
            ));
        }
        md.push('\n');
    }

    if !report.skipped.is_empty() {
        md.push_str("## Skipped\n\n");
        for s in &report.skipped {
            md.push_str(&format!("- **{}**: {}\n", s.ticker, s.reason));
        }
        md.push('\n');
    }

    md
}

fn category_cell(c: &CategoryScore) -> String {
    if c.signal {
        format!("**{}/{}**", c.points, c.cap)
    } else {
        format!("{}/{}", c.points, c.cap)
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

// ─── Detailed text report ───────────────────────────────────────────

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

/// Detailed breakdown for every alerted result, or `None` when nothing alerted.
pub fn detailed_report(report: &ScanReport) -> Option<String> {
    let alerts = report.alerts();
    if alerts.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(4096 * alerts.len());
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "EARLY BREAKOUT SCANNER - DETAILED REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "As of:            {}", report.as_of);
    let _ = writeln!(out, "Policy:           {}", report.policy);
    let _ = writeln!(out, "Alerted Stocks:   {}", alerts.len());
    let _ = writeln!(out, "High Priority:    {}", report.by_tier(AlertTier::HighPriority).len());
    let _ = writeln!(out, "Watch List:       {}", report.by_tier(AlertTier::WatchList).len());
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    for (rank, r) in alerts.iter().enumerate() {
        out.push_str(&stock_detail(r, rank + 1));
        out.push('\n');
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "END OF REPORT");
    let _ = writeln!(out, "{RULE}");
    Some(out)
}

fn tier_label(tier: AlertTier) -> &'static str {
    match tier {
        AlertTier::HighPriority => "HIGH PRIORITY",
        AlertTier::WatchList => "WATCH LIST",
        AlertTier::Skip => "SIGNAL ALERT",
    }
}

fn rsi_zone_wording(zone: RsiZone) -> &'static str {
    match zone {
        RsiZone::Accumulation => "ACCUMULATION ZONE (ideal range)",
        RsiZone::Early => "Early recovery (possibly too early)",
        RsiZone::Extended => "Getting extended (late)",
        RsiZone::Overbought => "OVERBOUGHT (too late)",
        RsiZone::Oversold => "Oversold (too early)",
    }
}

fn rs_slope_wording(slope: f64) -> &'static str {
    if slope > 0.005 {
        "Strongly positive"
    } else if slope > 0.002 {
        "Moderately positive"
    } else if slope > 0.0 {
        "Slightly positive"
    } else {
        "Negative/flat"
    }
}

fn outperformance_wording(pct: f64) -> &'static str {
    if pct > 5.0 {
        "Strong outperformance"
    } else if pct > 3.0 {
        "Solid outperformance"
    } else if pct > 1.0 {
        "Moderate outperformance"
    } else if pct > 0.0 {
        "Slight outperformance"
    } else {
        "Underperforming benchmark"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

fn breakdown(out: &mut String, category: &CategoryScore) {
    let _ = writeln!(out, "  Breakdown:");
    for c in &category.components {
        let _ = writeln!(out, "    - {}: {} ({} pts)", c.name.replace('_', " "), c.label, c.points);
    }
}

fn status_line(out: &mut String, marker: &str) {
    if !marker.is_empty() {
        let _ = writeln!(out, "  Status:                   {marker}");
    }
}

fn stock_detail(r: &CompositeResult, rank: usize) -> String {
    let mut out = String::new();
    let card = &r.score;
    let v = &r.volume.metrics;
    let m = &r.momentum.metrics;
    let rs = &r.relative_strength.metrics;
    let label = tier_label(card.tier);

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{} - ${:.2} | {} POINTS | RANK #{} | {}",
        r.ticker, r.current_price, card.total, rank, label
    );
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    let pct = if card.max_total > 0 {
        f64::from(card.total) / f64::from(card.max_total) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(out, "OVERALL SCORES:");
    let _ = writeln!(out, "  Total Score:      {}/{} points ({pct:.0}%)", card.total, card.max_total);
    let _ = writeln!(out, "  Alert Level:      {label}");
    let _ = writeln!(out, "  Signals Met:      {}/3", card.signals_met);
    for c in card.categories() {
        let _ = writeln!(out, "  {:<16}  {}/{} points", format!("{}:", c.category.title()), c.points, c.cap);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "VOLUME METRICS ({}/{} points)", card.volume.points, card.volume.cap);
    let _ = writeln!(out, "{THIN_RULE}");
    status_line(&mut out, &r.volume.status.marker());
    let _ = writeln!(out, "  Red Volume Ratio:         {:.3}x (red days vs window avg)", v.red_volume_ratio);
    let _ = writeln!(out, "  Red Day Avg Volume:       {:.0} shares", v.red_day_avg_volume);
    let _ = writeln!(out, "  Green Day Avg Volume:     {:.0} shares", v.green_day_avg_volume);
    match v.green_red_spread() {
        Some(spread) => {
            let _ = writeln!(out, "  Volume Spread:            Green days {spread:.2}x heavier than red days");
        }
        None => {
            let _ = writeln!(out, "  Volume Spread:            n/a");
        }
    }
    let _ = writeln!(out, "  Price Above EMA:          {}", yes_no(v.price_above_ma));
    breakdown(&mut out, &card.volume);
    let _ = writeln!(out);

    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "MOMENTUM METRICS ({}/{} points)", card.momentum.points, card.momentum.cap);
    let _ = writeln!(out, "{THIN_RULE}");
    status_line(&mut out, &r.momentum.status.marker());
    let _ = writeln!(out, "  RSI Current:              {:.2}", m.rsi_current);
    let _ = writeln!(
        out,
        "  RSI Slope:                {:.3} ({})",
        m.rsi_slope,
        if m.rsi_slope > 0.0 { "rising" } else { "falling" }
    );
    let _ = writeln!(out, "  RSI Zone:                 {}", rsi_zone_wording(m.rsi_zone));
    let _ = writeln!(out, "  MACD Histogram:           {:.4}", m.macd_histogram);
    let _ = writeln!(out, "  MACD Status:              {}", m.macd_state.describe());
    let _ = writeln!(out, "  OBV Days Rising:          {}", m.obv_days_rising);
    breakdown(&mut out, &card.momentum);
    let _ = writeln!(out);

    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(
        out,
        "RELATIVE STRENGTH METRICS ({}/{} points)",
        card.relative_strength.points, card.relative_strength.cap
    );
    let _ = writeln!(out, "{THIN_RULE}");
    status_line(&mut out, &r.relative_strength.status.marker());
    let _ = writeln!(out, "  RS Slope:                 {:.8}", rs.rs_slope);
    let _ = writeln!(out, "  RS Slope Quality:         {}", rs_slope_wording(rs.rs_slope));
    let _ = writeln!(out, "  Outperformance:           {:+.2}%", rs.outperformance);
    let _ = writeln!(out, "  Outperformance Quality:   {}", outperformance_wording(rs.outperformance));
    let _ = writeln!(out, "  20-Day Change:            {:+.2}%", rs.stock_change_20d);
    if rs.just_turned_positive {
        let _ = writeln!(out, "  RS just turned positive");
    }
    breakdown(&mut out, &card.relative_strength);
    let _ = writeln!(out);

    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "PRICE & VOLUME INFO");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "  Current Price:    ${:.2}", r.current_price);
    let _ = writeln!(out, "  Current Volume:   {} shares", r.current_volume);
    let _ = writeln!(out, "  Date:             {}", r.as_of);
    let _ = writeln!(out);

    out
}
