//! Property-based tests for deepflow
//!
//! - Test ledger invariants (unique IDs, max + 1 allocation)
//! - Test ranking invariants against a full sort
//! - Run with ProptestConfig::with_cases(100)

use chrono::Duration;
use deepflow::experiment::{clock, round_to, RunMaster, RunRecord, ScoreType};
use deepflow::report::topk::{top_k_by, SortOrder};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Distinct ExpIDs in arbitrary order
fn arb_exp_ids() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::btree_set(1u64..10_000, 1..30)
        .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// Scores as a metric would report them
fn arb_scores() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1000.0f64..1000.0, 0..60)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Ledger Properties
    // ========================================================================

    /// Property: next ExpID is one past the largest, whatever the insert order
    #[test]
    fn prop_next_exp_id_is_max_plus_one(ids in arb_exp_ids()) {
        let mut ledger = RunMaster::new("runmaster.csv");
        for id in &ids {
            ledger.upsert(RunRecord::new(*id, "P", format!("run {id}")));
        }
        let max = ids.iter().copied().max().unwrap_or(0);
        prop_assert_eq!(ledger.next_exp_id(), max + 1);
        prop_assert_eq!(ledger.len(), ids.len());
    }

    /// Property: upserting the same ID twice keeps one row
    #[test]
    fn prop_upsert_replaces(ids in arb_exp_ids()) {
        let mut ledger = RunMaster::new("runmaster.csv");
        for id in ids.iter().chain(ids.iter()) {
            ledger.upsert(RunRecord::new(*id, "P", format!("run {id}")));
        }
        prop_assert_eq!(ledger.len(), ids.len());
    }

    /// Property: descriptions collide regardless of case
    #[test]
    fn prop_description_check_ignores_case(description in "[a-zA-Z ]{1,20}") {
        let mut ledger = RunMaster::new("runmaster.csv");
        ledger.upsert(RunRecord::new(1, "P", description.clone()));
        prop_assert!(ledger.has_description(&description.to_uppercase()));
        prop_assert!(ledger.has_description(&description.to_lowercase()));
    }

    // ========================================================================
    // Score Properties
    // ========================================================================

    /// Property: rounding lands within half a unit of the last decimal
    #[test]
    fn prop_round_to_is_close(value in -1.0e6f64..1.0e6, decimals in 0u32..6) {
        let rounded = round_to(value, decimals);
        let unit = 10f64.powi(-i32::try_from(decimals).unwrap());
        prop_assert!((rounded - value).abs() <= unit / 2.0 + 1e-9);
    }

    /// Property: deltas are score minus reference
    #[test]
    fn prop_deltas_follow_score(
        score in -100.0f64..100.0,
        parent in -100.0f64..100.0,
        benchmark in -100.0f64..100.0
    ) {
        let mut run = RunRecord::builder(2, "P", "child")
            .parent(1, Some(parent))
            .benchmark(benchmark)
            .build();
        run.set_score(ScoreType::Error, "rmse", score, 4);

        let half_unit = 0.5e-4 + 1e-9;
        prop_assert!((run.improvement_parent().unwrap() - (score - parent)).abs() <= half_unit);
        prop_assert!((run.improvement_benchmark().unwrap() - (score - benchmark)).abs() <= half_unit);
    }

    // ========================================================================
    // Duration Properties
    // ========================================================================

    /// Property: whole-second durations survive format then parse
    #[test]
    fn prop_duration_text_roundtrip(seconds in 0i64..(400 * 86_400)) {
        let duration = Duration::seconds(seconds);
        let text = clock::format_duration(duration);
        prop_assert_eq!(clock::parse_duration(&text), Some(duration));
    }

    // ========================================================================
    // Ranking Properties
    // ========================================================================

    /// Property: top-k matches the first k of a full sort
    #[test]
    fn prop_top_k_matches_sort(scores in arb_scores(), k in 1usize..20) {
        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.truncate(k);

        let top = top_k_by(scores, k, SortOrder::Ascending, |v| *v).unwrap();
        prop_assert_eq!(top, sorted);
    }

    /// Property: descending top-k is monotonically decreasing
    #[test]
    fn prop_top_k_descending_monotonic(scores in arb_scores(), k in 1usize..20) {
        let top = top_k_by(scores.clone(), k, SortOrder::Descending, |v| *v).unwrap();
        prop_assert_eq!(top.len(), k.min(scores.len()));
        for pair in top.windows(2) {
            prop_assert!(pair[0] >= pair[1]);
        }
    }
}
