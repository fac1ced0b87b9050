//! Property tests for evaluation invariants.
//!
//! Uses proptest to verify, over random OHLCV series:
//! 1. Category points stay within [0, cap] and the total within the policy maximum
//! 2. The tier is a pure function of the total
//! 3. Indicator bounds hold (RSI in [0, 100], OBV steps by volume)
//! 4. Truncating at a date gives the same result as never seeing later bars

use breakscan_core::indicators::{obv, rsi};
use breakscan_core::scoring::PolicyPreset;
use breakscan_core::{evaluate, AlertTier, Bar, ScanConfig, ScoringPolicy, Series};
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_bar_deltas(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<(f64, f64, u64)>> {
    prop::collection::vec((-0.05..0.05_f64, -0.02..0.02_f64, 1_000u64..5_000_000), len)
}

fn build_series(symbol: &str, deltas: &[(f64, f64, u64)]) -> Series {
    let base = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let mut close = 50.0;
    let bars = deltas
        .iter()
        .enumerate()
        .map(|(i, &(ret, gap, volume))| {
            let open = close * (1.0 + gap);
            close *= 1.0 + ret;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume,
            }
        })
        .collect();
    Series::new(symbol, bars).unwrap()
}

fn arb_preset() -> impl Strategy<Value = PolicyPreset> {
    prop::sample::select(PolicyPreset::ALL.to_vec())
}

// ── 1 & 2. Score bounds and tiers ────────────────────────────────────

proptest! {
    #[test]
    fn scores_stay_in_bounds(
        stock in arb_bar_deltas(1..120),
        bench in arb_bar_deltas(1..120),
        preset in arb_preset(),
    ) {
        let config = ScanConfig::with_policy(ScoringPolicy::from_preset(preset));
        let result = evaluate(&build_series("AAA", &stock), Some(&build_series("SPY", &bench)), &config);
        let card = &result.score;

        for category in card.categories() {
            prop_assert!(category.points <= category.cap);
        }
        prop_assert!(card.total <= card.max_total);
        prop_assert_eq!(
            card.total,
            card.volume.points + card.momentum.points + card.relative_strength.points
        );
        prop_assert!(card.signals_met <= 3);
        prop_assert_eq!(card.tier, config.policy.tiers.tier_for(card.total));
        if card.tier > AlertTier::Skip {
            prop_assert!(card.alert_triggered);
        }
    }

    #[test]
    fn short_series_never_panics(stock in arb_bar_deltas(1..40)) {
        let result = evaluate(&build_series("AAA", &stock), None, &ScanConfig::default());
        prop_assert!(!result.relative_strength.status.is_computed());
        prop_assert!(result.total() <= 35);
    }
}

// ── 3. Indicator bounds ──────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_bounded_on_random_walks(deltas in arb_bar_deltas(16..200)) {
        let closes = build_series("AAA", &deltas).closes();
        for v in rsi(&closes, 14).into_iter().filter(|v| !v.is_nan()) {
            prop_assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn obv_steps_by_volume(deltas in arb_bar_deltas(2..100)) {
        let series = build_series("AAA", &deltas);
        let values = obv(series.bars());
        for (w, bars) in values.windows(2).zip(series.bars().windows(2)) {
            let step = (w[1] - w[0]).abs();
            prop_assert!(step == 0.0 || step == bars[1].volume as f64);
        }
    }
}

// ── 4. No lookahead ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn truncation_matches_prefix(deltas in arb_bar_deltas(40..120), cut in 35usize..40) {
        let full = build_series("AAA", &deltas);
        let cutoff = full.bars()[cut - 1].date;
        let truncated = full.truncate_at(cutoff).unwrap();
        let prefix = build_series("AAA", &deltas[..cut]);

        let config = ScanConfig::default();
        let a = evaluate(&truncated, None, &config);
        let b = evaluate(&prefix, None, &config);
        prop_assert_eq!(a, b);
    }
}
