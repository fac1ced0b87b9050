//! Replay of the engineered breakout through the harness.

mod common;

use breakscan_core::data::StaticProvider;
use breakscan_core::{evaluate, AlertTier, ScanConfig};
use breakscan_runner::{
    replay_at, replay_case, run_replay, ReplayCase, ReplayFile, ReplayOutcome, ReplaySettings,
};
use chrono::{Duration, NaiveDate};
use common::{benchmark_series, breakout_series, event_date, fixture_provider, start_date, wide_config};

fn brk_case(event: NaiveDate) -> ReplayCase {
    ReplayCase {
        ticker: "BRK".into(),
        event_date: event,
        note: Some("engineered breakout".into()),
        peak_price: Some(70.0),
    }
}

#[test]
fn replay_at_last_bar_matches_full_evaluation() {
    let config = ScanConfig::default();
    let series = breakout_series("BRK");
    let bench = benchmark_series();

    let outcome = replay_at(&series, Some(&bench), event_date(), &config);
    let direct = evaluate(&series, Some(&bench), &config);
    assert_eq!(outcome.result(), Some(&direct));
}

#[test]
fn replay_never_sees_later_bars() {
    let config = ScanConfig::default();
    let series = breakout_series("BRK");
    let bench = benchmark_series();

    for offset in [30, 20, 14, 7, 3, 1] {
        let as_of = event_date() - Duration::days(offset);
        let outcome = replay_at(&series, Some(&bench), as_of, &config);
        let result = outcome.result().expect("enough history");
        assert_eq!(result.as_of, as_of);

        let truncated = series.truncate_at(as_of).unwrap();
        assert_eq!(result.current_price, truncated.last().close);
        assert_eq!(result.relative_strength.metrics.aligned_len, truncated.len());
    }
}

#[test]
fn short_history_is_insufficient() {
    let config = ScanConfig::default();
    let as_of = start_date() + Duration::days(9);
    let outcome = replay_at(&breakout_series("BRK"), None, as_of, &config);
    assert_eq!(outcome, ReplayOutcome::InsufficientData { bars: 10 });
}

#[test]
fn timeline_catches_the_breakout() {
    let provider = fixture_provider();
    let case = brk_case(event_date());
    let bench = benchmark_series();
    let settings = ReplaySettings::default();

    let timeline = replay_case(&provider, &case, Some(&bench), &settings, &wide_config());

    assert_eq!(timeline.points.len(), 5);
    assert_eq!(timeline.points.last().unwrap().days_before, 0);
    assert!(timeline.points.iter().all(|p| matches!(p.outcome, ReplayOutcome::Evaluated(_))));

    let last = timeline.points.last().unwrap().outcome.result().unwrap();
    assert_eq!(last.tier(), AlertTier::HighPriority);

    let first = timeline.first_alert.expect("caught");
    assert!(first <= event_date());
    assert_eq!(timeline.lead_days, Some((event_date() - first).num_days()));

    let entry = timeline.entry_price.unwrap();
    let gain = timeline.potential_gain_pct.unwrap();
    assert!((gain - (70.0 - entry) / entry * 100.0).abs() < 1e-9);
    assert!(timeline.best_total().unwrap() >= 26);
}

#[test]
fn case_before_data_start_has_no_alert() {
    let provider = fixture_provider();
    let case = brk_case(start_date() - Duration::days(30));
    let timeline = replay_case(&provider, &case, None, &ReplaySettings::default(), &wide_config());

    assert!(timeline
        .points
        .iter()
        .all(|p| matches!(p.outcome, ReplayOutcome::InsufficientData { .. })));
    assert!(timeline.first_alert.is_none());
    assert!(timeline.lead_days.is_none());
    assert!(timeline.potential_gain_pct.is_none());
}

#[test]
fn run_replay_summarises_cases() {
    let file = ReplayFile::from_toml(&format!(
        r#"
        [settings]
        offsets = [3, 0]

        [[case]]
        ticker = "BRK"
        event_date = "{event}"

        [[case]]
        ticker = "MISSING"
        event_date = "{event}"
        "#,
        event = event_date()
    ))
    .unwrap();

    let report = run_replay(&fixture_provider(), &file, &wide_config());

    assert_eq!(report.timelines.len(), 2);
    assert!(report.timelines[0].caught());
    assert!(!report.timelines[1].caught());
    assert_eq!(report.summary.cases, 2);
    assert_eq!(report.summary.caught, 1);
    assert!((report.summary.catch_rate - 50.0).abs() < 1e-9);
    assert_eq!(report.summary.best_lead_days, report.timelines[0].lead_days);
}

#[test]
fn high_priority_threshold_is_stricter() {
    let provider = StaticProvider::new().with(breakout_series("BRK"));
    let settings = ReplaySettings {
        offsets: vec![0],
        window_days: None,
        min_tier: AlertTier::HighPriority,
    };
    // No benchmark: relative strength scores 0, leaving 22 which still clears 20.
    let timeline = replay_case(&provider, &brk_case(event_date()), None, &settings, &wide_config());
    assert_eq!(timeline.first_alert, Some(event_date()));
    assert_eq!(timeline.lead_days, Some(0));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn offset_scan_dates_are_sorted_unique_and_not_after_event(
            offsets in proptest::collection::vec(0u32..60, 1..12),
        ) {
            let settings = ReplaySettings { offsets: offsets.clone(), ..ReplaySettings::default() };
            let dates = settings.scan_dates(event_date());

            let mut unique = offsets;
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(dates.len(), unique.len());
            prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(dates.iter().all(|d| *d <= event_date()));
        }

        #[test]
        fn window_scan_dates_cover_every_day(window in 0u32..45) {
            let settings = ReplaySettings { window_days: Some(window), ..ReplaySettings::default() };
            let dates = settings.scan_dates(event_date());
            prop_assert_eq!(dates.len() as u32, window + 1);
            prop_assert_eq!(dates.last().copied(), Some(event_date()));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn replayed_result_is_dated_on_or_before_cutoff(days_back in 0i64..70) {
            let config = ScanConfig::default();
            let series = breakout_series("BRK");
            let bench = benchmark_series();
            let as_of = event_date() - Duration::days(days_back);

            if let Some(r) = replay_at(&series, Some(&bench), as_of, &config).result() {
                prop_assert!(r.as_of <= as_of);
            }
        }
    }
}
