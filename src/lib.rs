//! # DeepFlow: Experiment Tracking for ML Projects
//!
//! DeepFlow records every experiment run of a project in a CSV ledger
//! (`Artefacts/Overview/runmaster.csv`): what changed, which run it
//! branched from, its score against the parent and a benchmark, its params
//! and where its artefacts live.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use deepflow::experiment::{DeepFlow, FeatureImportance, RunOptions, RunStatus, ScoreType};
//! use deepflow::DeepFlowConfig;
//!
//! let config = DeepFlowConfig::load(std::path::Path::new("."))?;
//! let mut flow = DeepFlow::start(config, "Demand Forecast", "baseline", RunOptions::new())?;
//!
//! flow.log_score(ScoreType::Error, "rmse", 4.2, None)?;
//! flow.log_importance(&[FeatureImportance::new("lag_1", 0.8)])?;
//! flow.log_status(RunStatus::Completed, "", "")?;
//! # Ok::<(), deepflow::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod report;

pub use config::DeepFlowConfig;
pub use error::{Error, Result};
