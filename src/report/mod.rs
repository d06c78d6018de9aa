//! Dashboard data: rankings, lineage and feature summaries over the ledger
//!
//! Everything here is read-only over a loaded [`RunMaster`](crate::experiment::RunMaster)
//! plus the artefact folders it points at.

mod features;
mod journey;
pub mod topk;

pub use features::{
    artefact_dir_for, normalized_importance, run_features, top_features, FeatureReport,
    FeatureSummary,
};
pub use journey::{best_run, chosen_path, journey, top_runs, JourneyRow};
pub use topk::SortOrder;
