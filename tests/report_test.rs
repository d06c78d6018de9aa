//! Dashboard data tests over a project built through the tracker

use deepflow::experiment::{DeepFlow, FeatureImportance, RunMaster, RunOptions, RunStatus, ScoreType};
use deepflow::{report, DeepFlowConfig, Error};
use tempfile::TempDir;

/// Five runs scored on RMSE (error, lower is better):
///
/// ```text
/// 1 (5.0) ─┬─ 2 (4.0) ─── 4 (3.0)
///          └─ 3 (4.5) ─── 5 (3.5)
/// ```
fn project() -> (TempDir, DeepFlowConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = DeepFlowConfig::with_root(dir.path());

    let runs: [(&str, Option<u64>, f64, &[(&str, f64)]); 5] = [
        ("baseline", None, 5.0, &[("lag_1", 6.0), ("price", 4.0)]),
        ("add lags", Some(1), 4.0, &[("lag_1", 5.0), ("lag_7", 5.0)]),
        ("drop price", Some(1), 4.5, &[]),
        ("tune depth", Some(2), 3.0, &[("lag_1", 1.0), ("lag_7", 3.0)]),
        ("more trees", Some(3), 3.5, &[("price", 1.0)]),
    ];

    for (description, parent, score, importance) in runs {
        let mut options = RunOptions::new().benchmark(4.2);
        if let Some(parent) = parent {
            options = options.parent(parent);
        }
        let mut flow = DeepFlow::start(config.clone(), "Demand", description, options).unwrap();
        flow.log_score(ScoreType::Error, "rmse", score, None).unwrap();
        if !importance.is_empty() {
            let rows: Vec<FeatureImportance> = importance
                .iter()
                .map(|(feature, value)| FeatureImportance::new(*feature, *value))
                .collect();
            flow.log_importance(&rows).unwrap();
        }
        flow.log_status(RunStatus::Completed, "", "").unwrap();
    }

    (dir, config)
}

fn ledger(config: &DeepFlowConfig) -> RunMaster {
    RunMaster::open(config.ledger_path()).unwrap()
}

#[test]
fn test_best_run_and_chosen_path() {
    let (_dir, config) = project();
    let ledger = ledger(&config);

    assert_eq!(report::best_run(&ledger, None).unwrap().exp_id(), 4);
    assert_eq!(report::chosen_path(&ledger, None), vec![1, 2, 4]);
    assert_eq!(report::chosen_path(&ledger, Some("MAE")), Vec::<u64>::new());
}

#[test]
fn test_top_runs_rank_error_ascending() {
    let (_dir, config) = project();
    let ledger = ledger(&config);

    let ids: Vec<u64> = report::top_runs(&ledger, 3, Some("RMSE"))
        .unwrap()
        .iter()
        .map(|run| run.exp_id())
        .collect();
    assert_eq!(ids, vec![4, 5, 2]);
    assert!(matches!(
        report::top_runs(&ledger, 0, None),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_journey_flags_chosen_rows() {
    let (_dir, config) = project();
    let rows = report::journey(&ledger(&config), None, config.display_decimals);

    assert_eq!(rows.len(), 5);
    let chosen: Vec<u64> = rows.iter().filter(|r| r.chosen).map(|r| r.exp_id).collect();
    assert_eq!(chosen, vec![1, 2, 4]);

    let tuned = &rows[3];
    assert_eq!(tuned.parent_score, Some(4.0));
    assert_eq!(tuned.improvement_parent, Some(-1.0));
    assert_eq!(tuned.improvement_benchmark, Some(-1.2));
    assert!(tuned.duration.is_some());
}

#[test]
fn test_run_features_are_normalized() {
    let (_dir, config) = project();
    let ledger = ledger(&config);

    let features = report::run_features(&ledger, &config, 1, 10).unwrap();
    assert_eq!(features[0], FeatureImportance::new("lag_1", 0.6));
    assert_eq!(features[1], FeatureImportance::new("price", 0.4));

    assert!(report::run_features(&ledger, &config, 3, 10).unwrap().is_empty());
    assert!(matches!(
        report::run_features(&ledger, &config, 99, 10),
        Err(Error::RunNotFound(99))
    ));
}

#[test]
fn test_top_features_pool_best_runs() {
    let (_dir, config) = project();
    let ledger = ledger(&config);

    // Runs 4, 5 and 2 each weigh 1: lag_7 = 0.75 + 0.5, lag_1 = 0.25 + 0.5,
    // price = 1.0, over a total of 3.
    let summary = report::top_features(&ledger, &config, 3, 10, None).unwrap();
    assert_eq!(summary.runs_used, 3);

    let names: Vec<&str> = summary.features.iter().map(|f| f.feature.as_str()).collect();
    assert_eq!(names, vec!["lag_7", "price", "lag_1"]);
    assert_eq!(summary.features[0].importance, 0.42);
    assert_eq!(summary.features[0].count, 2);
    assert_eq!(summary.features[1].importance, 0.33);
    assert_eq!(summary.features[2].importance, 0.25);

    let top_one = report::top_features(&ledger, &config, 3, 1, None).unwrap();
    assert_eq!(top_one.features.len(), 1);
}

/// Start a run under `parent`, score it and complete it.
fn scored_run(
    config: &DeepFlowConfig,
    description: &str,
    parent: Option<u64>,
    score_type: ScoreType,
    metric: &str,
    score: f64,
) {
    let options = match parent {
        Some(parent) => RunOptions::new().parent(parent),
        None => RunOptions::new(),
    };
    let mut flow = DeepFlow::start(config.clone(), "Churn", description, options).unwrap();
    flow.log_score(score_type, metric, score, None).unwrap();
    flow.log_status(RunStatus::Completed, "", "").unwrap();
}

#[test]
fn test_accuracy_runs_rank_highest_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeepFlowConfig::with_root(dir.path());
    scored_run(&config, "baseline", None, ScoreType::Accuracy, "auc", 80.0);
    scored_run(&config, "add tenure", Some(1), ScoreType::Accuracy, "auc", 85.0);
    scored_run(&config, "tune depth", Some(2), ScoreType::Accuracy, "auc", 90.0);
    scored_run(&config, "drop region", Some(1), ScoreType::Accuracy, "auc", 88.0);
    let ledger = ledger(&config);

    let ids: Vec<u64> = report::top_runs(&ledger, 3, None)
        .unwrap()
        .iter()
        .map(|run| run.exp_id())
        .collect();
    assert_eq!(ids, vec![3, 4, 2]);
    assert_eq!(report::best_run(&ledger, Some("auc")).unwrap().exp_id(), 3);
    assert_eq!(report::chosen_path(&ledger, None), vec![1, 2, 3]);
}

#[test]
fn test_mixed_score_types_rank_by_latest_type() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeepFlowConfig::with_root(dir.path());
    scored_run(&config, "baseline", None, ScoreType::Error, "rmse", 5.0);
    scored_run(&config, "switch to auc", Some(1), ScoreType::Accuracy, "auc", 0.9);
    scored_run(&config, "auc tuned", Some(2), ScoreType::Accuracy, "auc", 0.95);
    scored_run(&config, "add lags", Some(1), ScoreType::Error, "rmse", 3.0);
    let ledger = ledger(&config);

    // Latest scored run is an error run, so only error runs are ranked.
    let ids: Vec<u64> = report::top_runs(&ledger, 5, None)
        .unwrap()
        .iter()
        .map(|run| run.exp_id())
        .collect();
    assert_eq!(ids, vec![4, 1]);
    assert_eq!(report::chosen_path(&ledger, None), vec![1, 4]);

    // A metric filter narrows the slice to accuracy runs.
    assert_eq!(report::best_run(&ledger, Some("AUC")).unwrap().exp_id(), 3);
    assert_eq!(report::chosen_path(&ledger, Some("AUC")), vec![1, 2, 3]);
}

#[test]
fn test_huge_k_from_config_does_not_crash() {
    let (_dir, mut config) = project();
    config.top_runs = usize::MAX;
    let ledger = ledger(&config);

    assert_eq!(report::top_runs(&ledger, usize::MAX, None).unwrap().len(), 5);
    let summary =
        report::top_features(&ledger, &config, config.top_runs, usize::MAX, None).unwrap();
    assert_eq!(summary.runs_used, 4);
    assert_eq!(summary.features.len(), 3);
}
