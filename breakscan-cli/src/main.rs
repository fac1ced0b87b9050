//! Breakscan CLI: scan, replay, download and policy commands.
//!
//! Commands:
//! - `scan`: score a ticker list as of a date and rank the results
//! - `replay`: score known events at dates leading up to them
//! - `download`: fetch market data from Yahoo Finance and cache as Parquet
//! - `policy`: print a scoring policy's tables as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use breakscan_core::data::{
    download_symbols, load_tickers, CircuitBreaker, CsvProvider, ParquetCache, SeriesProvider, StdoutProgress,
    Universe, YahooProvider,
};
use breakscan_core::scoring::{CategoryScore, PolicyPreset};
use breakscan_core::{ScanConfig, ScoringPolicy};
use breakscan_runner::{
    detailed_report, export_replay_csv, run_replay, save_artifacts, DataLoader, LoadOptions, ReplayFile,
    ReplayOutcome, ReplayReport, ScanReport, Scanner, WebhookNotifier,
};

const WEBHOOK_ENV: &str = "BREAKSCAN_WEBHOOK_URL";

#[derive(Parser)]
#[command(name = "breakscan", about = "Breakscan: early breakout candidate scanner")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where bars come from and how scoring is configured.
#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML scan config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scoring policy preset: extended, basic, early_entry.
    #[arg(long)]
    policy: Option<String>,

    /// Parquet cache directory.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Read `<SYMBOL>.csv` files from this directory instead of Yahoo Finance.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a ticker list and rank the results.
    Scan {
        /// Ticker file: one symbol per line, or a TOML universe. Defaults to the built-in universe.
        #[arg(long)]
        tickers: Option<PathBuf>,

        /// Scan one sector of a TOML universe (or of the built-in universe).
        #[arg(long)]
        sector: Option<String>,

        /// Scan as of this date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Save report.json, results.csv and report.md under this directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Webhook URL for alerts. Falls back to BREAKSCAN_WEBHOOK_URL.
        #[arg(long)]
        webhook: Option<String>,

        /// Keep only the top N results.
        #[arg(long)]
        top: Option<usize>,

        /// Print the detailed breakdown for each alert.
        #[arg(long, default_value_t = false)]
        details: bool,
    },
    /// Score known events at dates leading up to them.
    Replay {
        /// TOML file with [settings] and [[case]] entries.
        #[arg(long)]
        cases: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Write every sampled point to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Download market data from Yahoo Finance and cache as Parquet.
    Download {
        /// Ticker file: one symbol per line, or a TOML universe.
        #[arg(long)]
        tickers: PathBuf,

        /// Start date (YYYY-MM-DD). Defaults to one year ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Parquet cache directory.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Print a scoring policy's tables as TOML.
    Policy {
        /// Preset name: extended, basic, early_entry.
        #[arg(long, default_value = "extended")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan {
            tickers,
            sector,
            as_of,
            source,
            out,
            webhook,
            top,
            details,
        } => {
            let symbols = resolve_tickers(tickers.as_deref(), sector.as_deref())?;
            run_scan(symbols, as_of.as_deref(), &source, out.as_deref(), webhook, top, details)
        }
        Commands::Replay { cases, source, csv } => run_replay_cmd(&cases, &source, csv.as_deref()),
        Commands::Download {
            tickers,
            start,
            end,
            force,
            data_dir,
        } => run_download(&tickers, start.as_deref(), end.as_deref(), force, data_dir),
        Commands::Policy { name } => run_policy(&name),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "breakscan=debug" } else { "breakscan=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn resolve_tickers(path: Option<&Path>, sector: Option<&str>) -> Result<Vec<String>> {
    if let Some(sector) = sector {
        let universe = match path {
            Some(p) => {
                let content =
                    std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))?;
                Universe::from_toml(&content)?
            }
            None => Universe::default_us(),
        };
        let tickers = universe
            .sector_tickers(sector)
            .with_context(|| format!("available sectors: {}", universe.sector_names().join(", ")))?;
        return Ok(tickers.to_vec());
    }
    match path {
        Some(p) => load_tickers(p).with_context(|| format!("failed to load tickers from {}", p.display())),
        None => Ok(Universe::default_us().all_tickers()),
    }
}

fn resolve_config(source: &SourceArgs) -> Result<ScanConfig> {
    let mut config = match &source.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(name) = &source.policy {
        config.policy = policy_by_name(name)?;
    }
    config.validate()?;
    Ok(config)
}

fn policy_by_name(name: &str) -> Result<ScoringPolicy> {
    match ScoringPolicy::preset(name) {
        Some(p) => Ok(p),
        None => {
            let valid: Vec<&str> = PolicyPreset::ALL.iter().map(|p| p.name()).collect();
            bail!("unknown policy '{name}'. Valid: {}", valid.join(", "))
        }
    }
}

/// Parquet cache → remote (CSV directory or Yahoo, write-through) → synthetic.
fn build_loader(source: &SourceArgs) -> Result<DataLoader> {
    if source.offline {
        info!(synthetic = source.synthetic, "offline mode: no remote fetches");
    }
    let opts = LoadOptions {
        offline: source.offline,
        synthetic: source.synthetic,
        force: false,
    };
    let remote: Box<dyn SeriesProvider> = match &source.csv_dir {
        Some(dir) => Box::new(CsvProvider::new(dir)),
        None => Box::new(YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?),
    };
    Ok(DataLoader::new(opts)
        .with_cache(ParquetCache::new(&source.data_dir))
        .with_remote(remote))
}

fn run_scan(
    symbols: Vec<String>,
    as_of: Option<&str>,
    source: &SourceArgs,
    out: Option<&Path>,
    webhook: Option<String>,
    top: Option<usize>,
    details: bool,
) -> Result<()> {
    let mut config = resolve_config(source)?;
    if let Some(n) = top {
        config.scan.max_results = n;
    }
    if symbols.is_empty() {
        bail!("no tickers to scan");
    }
    let as_of = as_of.map(parse_date).transpose()?.unwrap_or_else(today);

    let scanner = Scanner::new(config, build_loader(source)?);
    let report = scanner.scan(&symbols, as_of);

    print_scan(&report);
    if details {
        if let Some(text) = detailed_report(&report) {
            println!("{text}");
        }
    }

    if let Some(dir) = out {
        let run_dir = save_artifacts(&report, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    let url = webhook.or_else(|| std::env::var(WEBHOOK_ENV).ok());
    let notifier = WebhookNotifier::new(url)?;
    if notifier.is_configured() {
        let delivery = notifier.notify_scan(&report);
        println!(
            "Webhook: alert {}, summary {}",
            if delivery.alert_sent { "sent" } else { "not sent" },
            if delivery.summary_sent { "sent" } else { "not sent" }
        );
    }

    Ok(())
}

fn category_cell(c: &CategoryScore) -> String {
    format!("{}/{}{}", c.points, c.cap, if c.signal { "*" } else { "" })
}

fn print_scan(report: &ScanReport) {
    println!();
    println!("=== Scan {} ({}) ===", report.as_of, report.policy);
    println!(
        "Scanned: {}  Evaluated: {}  Skipped: {}  Alerts: {}  ({} ms)",
        report.scanned,
        report.results.len(),
        report.skipped.len(),
        report.alerts().len(),
        report.duration_ms
    );
    if !report.benchmark_available {
        println!("WARNING: benchmark {} unavailable; relative strength scored 0", report.benchmark);
    }
    println!();

    if report.results.is_empty() {
        println!("No tickers evaluated.");
    } else {
        println!(
            "{:>4} {:<8} {:>10} {:>7} {:<14} {:>7} {:>7} {:>9} {:>6}",
            "#", "Ticker", "Price", "Total", "Tier", "Signals", "Volume", "Momentum", "RS"
        );
        println!("{}", "-".repeat(82));
        for (i, r) in report.results.iter().enumerate() {
            println!(
                "{:>4} {:<8} {:>10.2} {:>7} {:<14} {:>7} {:>7} {:>9} {:>6}",
                i + 1,
                r.ticker,
                r.current_price,
                format!("{}/{}", r.score.total, r.score.max_total),
                r.tier().as_str(),
                format!("{}/3", r.score.signals_met),
                category_cell(&r.score.volume),
                category_cell(&r.score.momentum),
                category_cell(&r.score.relative_strength),
            );
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for s in &report.skipped {
            println!("  {:<8} {}", s.ticker, s.reason);
        }
    }
    if report.has_synthetic() {
        println!();
        println!("WARNING: SYNTHETIC data used for: {}", report.synthetic.join(", "));
    }
    println!();
}

fn run_replay_cmd(cases: &Path, source: &SourceArgs, csv: Option<&Path>) -> Result<()> {
    let config = resolve_config(source)?;
    let file = ReplayFile::load(cases)?;
    let loader = build_loader(source)?;

    let report = run_replay(&loader, &file, &config);
    print_replay(&report, config.policy.max_total());

    if let Some(path) = csv {
        std::fs::write(path, export_replay_csv(&report.timelines)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Replay points saved to: {}", path.display());
    }
    Ok(())
}

fn print_replay(report: &ReplayReport, max_total: u32) {
    for t in &report.timelines {
        println!();
        println!("=== {} (event {}) ===", t.case.ticker, t.case.event_date);
        if let Some(note) = &t.case.note {
            println!("{note}");
        }
        println!("{:<12} {:>6} {:>7} {:<14} {:>7} {:>10}", "Date", "Before", "Total", "Tier", "Signals", "Price");
        for p in &t.points {
            match &p.outcome {
                ReplayOutcome::Evaluated(r) => println!(
                    "{:<12} {:>5}d {:>7} {:<14} {:>7} {:>10.2}",
                    p.date.to_string(),
                    p.days_before,
                    format!("{}/{}", r.total(), max_total),
                    r.tier().as_str(),
                    format!("{}/3", r.score.signals_met),
                    r.current_price
                ),
                ReplayOutcome::InsufficientData { bars } => println!(
                    "{:<12} {:>5}d  insufficient data ({bars} bars)",
                    p.date.to_string(),
                    p.days_before
                ),
            }
        }
        match (t.first_alert, t.lead_days) {
            (Some(date), Some(lead)) => {
                print!("Caught: first alert {date} ({lead} days before event)");
                if let (Some(entry), Some(gain)) = (t.entry_price, t.potential_gain_pct) {
                    print!(", entry ${entry:.2}, potential {gain:+.1}%");
                }
                println!();
            }
            _ => println!(
                "Missed: best score {}/{max_total}, most signals {}/3",
                t.best_total().unwrap_or(0),
                t.most_signals().unwrap_or(0)
            ),
        }
    }

    let s = &report.summary;
    println!();
    println!("=== Replay Summary ===");
    println!("Caught:       {}/{} ({:.1}%)", s.caught, s.cases, s.catch_rate);
    if let Some(mean) = s.mean_lead_days {
        println!("Mean lead:    {mean:.1} days");
    }
    if let Some(best) = s.best_lead_days {
        println!("Best lead:    {best} days");
    }
    println!();
}

fn run_download(tickers: &Path, start: Option<&str>, end: Option<&str>, force: bool, data_dir: PathBuf) -> Result<()> {
    let symbols = resolve_tickers(Some(tickers), None)?;
    let end_date = end.map(parse_date).transpose()?.unwrap_or_else(today);
    let start_date = start
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| end_date - chrono::Duration::days(365));
    if start_date > end_date {
        bail!("--start {start_date} is after --end {end_date}");
    }

    let provider = YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    let cache = ParquetCache::new(data_dir);

    let summary = download_symbols(&provider, &cache, &symbols, start_date, end_date, force, &StdoutProgress);

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        bail!("{} of {} downloads failed", summary.failed, summary.total);
    }
    Ok(())
}

/// Policy tables wrapped so the output pastes into a scan config.
#[derive(serde::Serialize)]
struct PolicyDocument<'a> {
    policy: &'a ScoringPolicy,
}

fn run_policy(name: &str) -> Result<()> {
    let policy = policy_by_name(name)?;
    policy.validate()?;
    let toml = toml::to_string_pretty(&PolicyDocument { policy: &policy }).context("failed to render policy")?;
    println!("# {} policy, {} points maximum", policy.name, policy.max_total());
    println!("{toml}");
    Ok(())
}
