//! Tests for the top-level configuration API

use std::fs;

use deepflow::experiment::{DeepFlow, RunMaster, RunOptions, ScoreType};
use deepflow::{DeepFlowConfig, Error};

#[test]
fn test_config_with_root() {
    let config = DeepFlowConfig::with_root("/tmp/project");
    assert_eq!(config.artefacts_dir, "Artefacts");
    assert_eq!(config.overview_dir, "Overview");
    assert_eq!(config.display_decimals, 4);
    assert_eq!(config.top_runs, 5);
}

#[test]
fn test_config_bad_type_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("deepflow.toml"), "score_decimals = \"many\"\n").unwrap();

    let result = DeepFlowConfig::load(dir.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_tracker_follows_loaded_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("deepflow.toml"),
        "artefacts_dir = \"runs\"\nledger_file = \"ledger.csv\"\nscore_decimals = 1\n",
    )
    .unwrap();
    let config = DeepFlowConfig::load(dir.path()).unwrap();

    let mut flow = DeepFlow::start(config.clone(), "P", "baseline", RunOptions::new()).unwrap();
    flow.log_score(ScoreType::Error, "mae", 1.26, None).unwrap();

    let ledger_path = dir.path().join("runs/Overview/ledger.csv");
    assert_eq!(config.ledger_path(), ledger_path);
    assert!(dir.path().join("runs/exp_1 - baseline/logs.csv").exists());

    let ledger = RunMaster::open(&ledger_path).unwrap();
    assert_eq!(ledger.get(1).unwrap().score(), Some(1.3));
}

#[test]
fn test_explicit_decimals_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeepFlowConfig::with_root(dir.path());

    let mut flow = DeepFlow::start(config, "P", "baseline", RunOptions::new()).unwrap();
    flow.log_score(ScoreType::Accuracy, "auc", 0.87654, Some(3)).unwrap();
    assert_eq!(flow.record().score(), Some(0.877));
}
