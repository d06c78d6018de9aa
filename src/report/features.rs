//! Feature importance summaries across runs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::journey::top_runs;
use crate::experiment::{
    round_to, ArtefactDir, FeatureImportance, RunMaster, RunRecord, ARTEFACTS_PARAM,
};
use crate::{DeepFlowConfig, Error, Result};

/// Aggregated importance of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    /// Feature name as written in the importance sheets.
    pub feature: String,
    /// Share of total importance, 0..=1.
    pub importance: f64,
    /// Number of runs the feature appeared in.
    pub count: usize,
}

/// Result of [`top_features`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureReport {
    /// Runs that had an importance sheet.
    pub runs_used: usize,
    /// Largest features first.
    pub features: Vec<FeatureSummary>,
}

/// Sum importance per feature and scale so the total is 1.
///
/// Output is sorted by feature name. A zero total leaves the sums as is.
#[must_use]
pub fn normalized_importance(rows: &[FeatureImportance]) -> Vec<FeatureImportance> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *sums.entry(row.feature.as_str()).or_insert(0.0) += row.importance;
    }
    let total: f64 = sums.values().sum();
    let scale = if total == 0.0 { 1.0 } else { total };

    sums.into_iter()
        .map(|(feature, sum)| FeatureImportance::new(feature, sum / scale))
        .collect()
}

/// Folder holding a run's artefacts: the recorded `Artefacts` param, or
/// the default `exp_{id} - {description}` layout.
#[must_use]
pub fn artefact_dir_for(config: &DeepFlowConfig, run: &RunRecord) -> ArtefactDir {
    match run.param(ARTEFACTS_PARAM) {
        Some(path) if !path.is_empty() => ArtefactDir::new(path),
        _ => ArtefactDir::new(config.run_path(run.exp_id(), run.description())),
    }
}

/// Largest features of a single run, normalized, largest first.
///
/// # Errors
///
/// [`Error::RunNotFound`] for an unknown run, or a CSV error reading the
/// importance sheet. A run without a sheet yields an empty list.
pub fn run_features(
    ledger: &RunMaster,
    config: &DeepFlowConfig,
    exp_id: u64,
    k: usize,
) -> Result<Vec<FeatureImportance>> {
    let run = ledger.get(exp_id).ok_or(Error::RunNotFound(exp_id))?;
    let dir = artefact_dir_for(config, run);
    if !dir.has_importance() {
        return Ok(Vec::new());
    }

    let mut features = normalized_importance(&dir.read_importance()?);
    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    features.truncate(k);
    Ok(features)
}

/// Importance pooled over the best `k_runs` runs.
///
/// Each run's importances are normalized first, so every run weighs the
/// same. The pooled sums are renormalized, rounded to 2 decimals and the
/// `k_features` largest kept. Unreadable sheets are skipped with a warning.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `k_runs` is zero.
pub fn top_features(
    ledger: &RunMaster,
    config: &DeepFlowConfig,
    k_runs: usize,
    k_features: usize,
    metric: Option<&str>,
) -> Result<FeatureReport> {
    let mut pooled: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut runs_used = 0;

    for run in top_runs(ledger, k_runs, metric)? {
        let dir = artefact_dir_for(config, run);
        if !dir.has_importance() {
            continue;
        }
        let rows = match dir.read_importance() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(exp_id = run.exp_id(), error = %e, "skipping unreadable importance sheet");
                continue;
            }
        };
        runs_used += 1;
        for row in normalized_importance(&rows) {
            let entry = pooled.entry(row.feature).or_insert((0.0, 0));
            entry.0 += row.importance;
            entry.1 += 1;
        }
    }

    let total: f64 = pooled.values().map(|(sum, _)| sum).sum();
    let scale = if total == 0.0 { 1.0 } else { total };
    let mut features: Vec<FeatureSummary> = pooled
        .into_iter()
        .map(|(feature, (sum, count))| FeatureSummary {
            feature,
            importance: round_to(sum / scale, 2),
            count,
        })
        .collect();
    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    features.truncate(k_features);

    debug!(runs_used, features = features.len(), "pooled feature importance");
    Ok(FeatureReport {
        runs_used,
        features,
    })
}
