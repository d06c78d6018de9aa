//! Experiment Tracking Example
//!
//! Logs a small branching project into a temporary folder, then reads the
//! dashboard data back out of the run master.
//!
//! Run with: cargo run --example experiment_tracking

use deepflow::experiment::{DeepFlow, FeatureImportance, RunMaster, RunOptions, RunStatus, ScoreType};
use deepflow::{report, DeepFlowConfig};

fn main() -> deepflow::Result<()> {
    println!("=== DeepFlow Experiment Tracking ===\n");

    let root = tempfile::tempdir()?;
    let config = DeepFlowConfig::with_root(root.path());

    // -------------------------------------------------------------------------
    // 1. Baseline run
    // -------------------------------------------------------------------------
    println!("1. Baseline run...");

    let options = RunOptions::new().benchmark(4.2).param("model", "LGB");
    let mut baseline = DeepFlow::start(config.clone(), "Demand Forecast", "baseline", options)?;
    baseline.log_status(RunStatus::Running, "features built", "")?;
    baseline.log_score(ScoreType::Error, "rmse", 5.03, None)?;
    baseline.log_importance(&[
        FeatureImportance::new("price", 4.0),
        FeatureImportance::new("promo", 1.0),
    ])?;
    baseline.log_status(RunStatus::Completed, "", "")?;
    println!("   ExpID: {}", baseline.exp_id());
    println!("   Folder: {}", baseline.artefact_dir().path().display());

    // -------------------------------------------------------------------------
    // 2. Branches off the baseline
    // -------------------------------------------------------------------------
    println!("\n2. Branching...");

    let branches = [
        ("add lags", 1, 4.11, vec![("lag_7", 3.0), ("price", 2.0)]),
        ("drop promo", 1, 4.87, vec![("price", 1.0)]),
        ("tune depth", 2, 3.64, vec![("lag_7", 4.0), ("lag_1", 1.0)]),
    ];
    for (description, parent, score, importance) in branches {
        let options = RunOptions::new().parent(parent).benchmark(4.2).param("model", "LGB");
        let mut flow = DeepFlow::start(config.clone(), "Demand Forecast", description, options)?;
        flow.log_score(ScoreType::Error, "rmse", score, None)?;

        let rows: Vec<FeatureImportance> = importance
            .into_iter()
            .map(|(feature, value)| FeatureImportance::new(feature, value))
            .collect();
        flow.log_importance(&rows)?;
        flow.observe(&format!("{description} scored {score}"))?;
        flow.log_status(RunStatus::Completed, "", "")?;

        let run = flow.record();
        println!(
            "   exp {} <- {}: {:<12} rmse={:.2}  vs parent {:+.2}",
            run.exp_id(),
            parent,
            description,
            score,
            run.improvement_parent().unwrap_or_default()
        );
    }

    // -------------------------------------------------------------------------
    // 3. A rejected run
    // -------------------------------------------------------------------------
    println!("\n3. Reusing a description...");
    match DeepFlow::start(
        config.clone(),
        "Demand Forecast",
        "Add Lags",
        RunOptions::new().parent(1),
    ) {
        Ok(_) => println!("   unexpectedly accepted"),
        Err(e) => println!("   rejected: {e}"),
    }

    // -------------------------------------------------------------------------
    // 4. Dashboard data
    // -------------------------------------------------------------------------
    println!("\n4. Journey:");

    let ledger = RunMaster::open(config.ledger_path())?;
    for row in report::journey(&ledger, None, config.display_decimals) {
        println!(
            "   {} exp {} {:<12} {:>6}",
            if row.chosen { "*" } else { " " },
            row.exp_id,
            row.description,
            row.score.map_or_else(String::new, |s| s.to_string())
        );
    }
    println!("   Road to best: {:?}", report::chosen_path(&ledger, None));

    println!("\n5. Top features across the best runs:");
    let summary = report::top_features(&ledger, &config, config.top_runs, 3, None)?;
    for feature in summary.features {
        println!(
            "   {:<8} {:.2}  (in {} runs)",
            feature.feature, feature.importance, feature.count
        );
    }

    println!("\n=== Experiment Tracking Complete ===");
    Ok(())
}
