//! Breakscan Runner: scan orchestration, historical replay, export, alerts.
//!
//! This crate builds on `breakscan-core` to provide:
//! - Data loading with cache/download/synthetic fallback
//! - Parallel scans over a ticker list with skip accounting
//! - Replay of known events to measure how early a policy alerts
//! - CSV, JSON, Markdown and text exports
//! - Webhook alert and summary notifications

pub mod data_loader;
pub mod export;
pub mod notify;
pub mod replay;
pub mod scanner;

pub use data_loader::{generate_synthetic_series, DataLoader, LoadError, LoadOptions};
pub use export::{
    detailed_report, export_json, export_replay_csv, export_results_csv, generate_markdown, import_json,
    load_artifacts, save_artifacts, CSV_COLUMNS,
};
pub use notify::{AlertPayload, Delivery, NotifyError, SummaryPayload, WebhookNotifier};
pub use replay::{
    replay_at, replay_case, replay_series, run_replay, ReplayCase, ReplayFile, ReplayOutcome, ReplayPoint,
    ReplayReport, ReplaySettings, ReplaySummary, ReplayTimeline,
};
pub use scanner::{fetch_window_days, ScanReport, Scanner, Skip, SkipReason, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scan_report_is_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn loader_is_send_sync() {
        assert_send::<DataLoader>();
        assert_sync::<DataLoader>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn scanner_over_loader_is_send_sync() {
        assert_send::<Scanner<DataLoader>>();
        assert_sync::<Scanner<DataLoader>>();
    }

    #[test]
    fn replay_types_are_send_sync() {
        assert_send::<ReplayTimeline>();
        assert_sync::<ReplayTimeline>();
        assert_send::<ReplaySettings>();
        assert_sync::<ReplaySettings>();
    }

    #[test]
    fn notifier_is_send_sync() {
        assert_send::<WebhookNotifier>();
        assert_sync::<WebhookNotifier>();
    }
}
