//! Experiment tracking: the run master ledger and per-run artefacts
//!
//! ## Schema Overview
//!
//! ```text
//! RunMaster (runmaster.csv) ──< RunRecord (N)
//!                                  │  └── ParentID ──> RunRecord
//!                                  │
//!                                  └── ArtefactDir (exp_{id} - {description}/)
//!                                        ├──< LogRecord (logs.csv)
//!                                        └──< {name}.csv artefacts
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use deepflow::experiment::{RunMaster, RunRecord, RunStatus, ScoreType};
//!
//! let mut ledger = RunMaster::new("runmaster.csv");
//! let mut run = RunRecord::new(ledger.next_exp_id(), "My Project", "baseline");
//! run.set_score(ScoreType::Error, "rmse", 3.21, 2);
//! ledger.upsert(run);
//!
//! assert_eq!(ledger.next_exp_id(), 2);
//! assert_eq!(ledger.get(1).unwrap().status(), RunStatus::Running);
//! ```

pub mod artefacts;
pub mod clock;
mod log_record;
mod run_record;
mod store;
mod tracker;

pub use artefacts::{ArtefactDir, FeatureImportance};
pub use log_record::{LogRecord, LogStatus};
pub use run_record::{
    round_to, RunRecord, RunRecordBuilder, RunStatus, ScoreType, ARTEFACTS_PARAM, LEDGER_COLUMNS,
};
pub use store::RunMaster;
pub use tracker::{DeepFlow, RunOptions};
