//! Journey - ranking runs and tracing the road to the best model

use chrono::Duration;

use super::topk::{top_k_by, SortOrder};
use crate::experiment::{round_to, RunMaster, RunRecord, RunStatus, ScoreType};
use crate::Result;

/// Score type the ranking runs under for this ledger slice.
///
/// With a metric filter, that metric's runs decide; mixed score types
/// fall back to the most recently scored run's type.
fn ranking_type(scored: &[&RunRecord]) -> Option<ScoreType> {
    scored.iter().rev().find_map(|run| run.score_type())
}

fn scored_runs<'a>(ledger: &'a RunMaster, metric: Option<&str>) -> Vec<&'a RunRecord> {
    let mut scored: Vec<&RunRecord> = ledger
        .runs()
        .iter()
        .filter(|run| run.score().is_some() && run.score_type().is_some())
        .filter(|run| match metric {
            Some(m) => run.metric().is_some_and(|rm| rm.eq_ignore_ascii_case(m)),
            None => true,
        })
        .collect();

    if let Some(score_type) = ranking_type(&scored) {
        scored.retain(|run| run.score_type() == Some(score_type));
    }
    scored
}

/// The K best scored runs, best first.
///
/// Error scores rank ascending, accuracy scores descending. Runs without
/// a score are skipped.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidInput`] if `k` is zero.
pub fn top_runs<'a>(
    ledger: &'a RunMaster,
    k: usize,
    metric: Option<&str>,
) -> Result<Vec<&'a RunRecord>> {
    let scored = scored_runs(ledger, metric);
    let Some(score_type) = ranking_type(&scored) else {
        return Ok(Vec::new());
    };
    top_k_by(scored, k, SortOrder::from(score_type), |run| {
        run.score().unwrap_or(f64::NAN)
    })
}

/// Best scored run, optionally restricted to one metric.
#[must_use]
pub fn best_run<'a>(ledger: &'a RunMaster, metric: Option<&str>) -> Option<&'a RunRecord> {
    top_runs(ledger, 1, metric)
        .ok()
        .and_then(|runs| runs.into_iter().next())
}

/// ExpIDs from the root down to the best run: the road to the best model.
#[must_use]
pub fn chosen_path(ledger: &RunMaster, metric: Option<&str>) -> Vec<u64> {
    let Some(best) = best_run(ledger, metric) else {
        return Vec::new();
    };
    let mut path = ledger.lineage(best.exp_id());
    path.reverse();
    path
}

/// One ledger row prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyRow {
    /// Experiment ID.
    pub exp_id: u64,
    /// Parent experiment ID.
    pub parent_id: Option<u64>,
    /// What changed in this run.
    pub description: String,
    /// Run status.
    pub status: RunStatus,
    /// Run duration, once ended.
    pub duration: Option<Duration>,
    /// Metric name.
    pub metric: Option<String>,
    /// Score, rounded for display.
    pub score: Option<f64>,
    /// Parent score, rounded for display.
    pub parent_score: Option<f64>,
    /// Delta to parent, rounded for display.
    pub improvement_parent: Option<f64>,
    /// Benchmark, rounded for display.
    pub benchmark: Option<f64>,
    /// Delta to benchmark, rounded for display.
    pub improvement_benchmark: Option<f64>,
    /// On the road to the best model.
    pub chosen: bool,
}

/// Every run in ledger order, metric columns rounded to `decimals`,
/// flagged when it lies on the chosen path.
#[must_use]
pub fn journey(ledger: &RunMaster, metric: Option<&str>, decimals: u32) -> Vec<JourneyRow> {
    let chosen = chosen_path(ledger, metric);
    let round = |v: Option<f64>| v.map(|x| round_to(x, decimals));

    ledger
        .runs()
        .iter()
        .map(|run| JourneyRow {
            exp_id: run.exp_id(),
            parent_id: run.parent_id(),
            description: run.description().to_string(),
            status: run.status(),
            duration: run.duration(),
            metric: run.metric().map(str::to_string),
            score: round(run.score()),
            parent_score: round(run.parent_score()),
            improvement_parent: round(run.improvement_parent()),
            benchmark: round(run.benchmark()),
            improvement_benchmark: round(run.improvement_benchmark()),
            chosen: chosen.contains(&run.exp_id()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: u64, parent: Option<u64>, metric: &str, score: Option<f64>) -> RunRecord {
        let mut builder = RunRecord::builder(id, "proj", format!("run {id}"));
        if let Some(p) = parent {
            builder = builder.parent(p, None);
        }
        let mut record = builder.build();
        if let Some(s) = score {
            record.set_score(ScoreType::Error, metric, s, 4);
        }
        record
    }

    fn ledger() -> RunMaster {
        let mut ledger = RunMaster::new("unused.csv");
        ledger.upsert(run(1, None, "rmse", Some(5.0)));
        ledger.upsert(run(2, Some(1), "rmse", Some(4.0)));
        ledger.upsert(run(3, Some(1), "rmse", Some(4.5)));
        ledger.upsert(run(4, Some(2), "rmse", Some(3.2)));
        ledger.upsert(run(5, Some(4), "mae", Some(1.0)));
        ledger.upsert(run(6, Some(4), "rmse", None));
        ledger
    }

    #[test]
    fn test_best_run_for_error_is_lowest() {
        let ledger = ledger();
        assert_eq!(best_run(&ledger, Some("RMSE")).unwrap().exp_id(), 4);
        assert_eq!(best_run(&ledger, None).unwrap().exp_id(), 5);
    }

    #[test]
    fn test_chosen_path_root_first() {
        assert_eq!(chosen_path(&ledger(), Some("rmse")), vec![1, 2, 4]);
    }

    #[test]
    fn test_top_runs_skips_unscored() {
        let ledger = ledger();
        let ids: Vec<u64> = top_runs(&ledger, 3, Some("rmse"))
            .unwrap()
            .iter()
            .map(|r| r.exp_id())
            .collect();
        assert_eq!(ids, vec![4, 2, 3]);
    }

    #[test]
    fn test_journey_flags_chosen() {
        let rows = journey(&ledger(), Some("rmse"), 4);
        let chosen: Vec<u64> = rows.iter().filter(|r| r.chosen).map(|r| r.exp_id).collect();
        assert_eq!(chosen, vec![1, 2, 4]);
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = RunMaster::new("unused.csv");
        assert!(best_run(&ledger, None).is_none());
        assert!(chosen_path(&ledger, None).is_empty());
    }
}
