//! Run tracker - the session object a training script holds while it runs
//!
//! ```rust,no_run
//! use deepflow::experiment::{DeepFlow, RunOptions, RunStatus, ScoreType};
//! use deepflow::DeepFlowConfig;
//!
//! let config = DeepFlowConfig::with_root(".");
//! let options = RunOptions::new().parent(1).benchmark(90.0).param("model", "LGB");
//! let mut flow = DeepFlow::start(config, "Demand Forecast", "add lag 7", options)?;
//!
//! flow.log_score(ScoreType::Accuracy, "rmse", 94.0, None)?;
//! flow.log_status(RunStatus::Running, "features built", "")?;
//! flow.log_status(RunStatus::Completed, "", "")?;
//! # Ok::<(), deepflow::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::artefacts::{
    check_path_component, ArtefactDir, FeatureImportance, IMPORTANCE_ARTEFACT,
};
use super::run_record::ARTEFACTS_PARAM;
use super::{clock, LogRecord, RunMaster, RunRecord, RunStatus, ScoreType};
use crate::{DeepFlowConfig, Error, Result};

/// Optional settings for a new run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    parent_id: Option<u64>,
    benchmark: Option<f64>,
    params: BTreeMap<String, String>,
}

impl RunOptions {
    /// No parent, no benchmark, no params.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run this one branches from. Required once the ledger has runs.
    #[must_use]
    pub const fn parent(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Benchmark score the run is trying to beat.
    #[must_use]
    pub const fn benchmark(mut self, benchmark: f64) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    /// Add a param shown alongside the run.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }
}

/// An open run: its ledger row, artefact folder and log sheet.
///
/// Every mutation re-reads the ledger from disk and writes it back with
/// this run's row replaced, so runs started elsewhere in the meantime
/// are preserved.
#[derive(Debug)]
pub struct DeepFlow {
    config: DeepFlowConfig,
    record: RunRecord,
    run_dir: ArtefactDir,
    logs: Vec<LogRecord>,
}

impl DeepFlow {
    /// Register a new run in the ledger and prepare its artefact folder.
    ///
    /// For the first run of a project the overview folder is created with
    /// blank learnings and observations sheets, and any parent is ignored.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateDescription`], [`Error::MissingParent`] or
    /// [`Error::ParentNotFound`] when the ledger rules are broken;
    /// [`Error::InvalidInput`] when the description cannot name a folder
    /// (empty, `..`, or containing a path separator); IO/CSV errors when
    /// files cannot be written.
    pub fn start(
        config: DeepFlowConfig,
        project: impl Into<String>,
        description: impl Into<String>,
        options: RunOptions,
    ) -> Result<Self> {
        let project = project.into();
        let description = description.into();
        check_path_component("description", &description)?;
        let ledger = RunMaster::open(config.ledger_path())?;
        ledger.validate_new_run(&description, options.parent_id)?;

        let exp_id = ledger.next_exp_id();
        let started_at = clock::now();
        let mut builder = RunRecord::builder(exp_id, project.as_str(), description.as_str())
            .params(options.params)
            .start_time(started_at);

        if ledger.is_empty() {
            info!(project = %project, "Starting your first experiment for {project}? Best of luck");
            if let Some(parent) = options.parent_id {
                warn!(parent, "first run of a project has no parent, ignoring");
            }
        } else if let Some(parent) = options.parent_id {
            builder = builder.parent(parent, ledger.parent_score(parent)?);
        }
        if let Some(benchmark) = options.benchmark {
            builder = builder.benchmark(benchmark);
        }

        if !ledger.exists() {
            ArtefactDir::new(config.overview_path()).init_overview()?;
        }

        let run_dir = ArtefactDir::new(config.run_path(exp_id, &description));
        run_dir.init_run()?;

        let logs = vec![LogRecord::started(exp_id, description.as_str(), started_at)];
        run_dir.write_logs(&logs)?;

        let flow = Self {
            config,
            record: builder.build(),
            run_dir,
            logs,
        };
        flow.save()?;

        info!(
            exp_id,
            parent = ?flow.record.parent_id(),
            folder = %flow.run_dir.path().display(),
            "started experiment"
        );
        Ok(flow)
    }

    /// Reattach to a run that is still Running.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`] if the ledger has no such run, or
    /// [`Error::RunEnded`] if it already completed or failed.
    pub fn resume(config: DeepFlowConfig, exp_id: u64) -> Result<Self> {
        let ledger = RunMaster::open(config.ledger_path())?;
        let record = ledger
            .get(exp_id)
            .cloned()
            .ok_or(Error::RunNotFound(exp_id))?;
        if record.status().is_terminal() {
            return Err(Error::RunEnded {
                exp_id,
                status: record.status().to_string(),
            });
        }

        let run_dir = ArtefactDir::new(config.run_path(exp_id, record.description()));
        let mut logs = run_dir.read_logs()?;
        if logs.is_empty() {
            let started_at = record.start_time().unwrap_or_else(clock::now);
            logs.push(LogRecord::started(exp_id, record.description(), started_at));
        }

        debug!(exp_id, logs = logs.len(), "resumed experiment");
        Ok(Self {
            config,
            record,
            run_dir,
            logs,
        })
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn exp_id(&self) -> u64 {
        self.record.exp_id()
    }

    /// Get the current ledger row.
    #[must_use]
    pub const fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Get the run's artefact folder.
    #[must_use]
    pub const fn artefact_dir(&self) -> &ArtefactDir {
        &self.run_dir
    }

    /// Get the log rows written so far.
    #[must_use]
    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    /// Append a row to `logs.csv` and update the run's status.
    ///
    /// Completed and Failed end the run: end time and duration are set and
    /// further status logs are refused.
    ///
    /// # Errors
    ///
    /// [`Error::RunEnded`] if the run already ended; IO/CSV errors.
    pub fn log_status(
        &mut self,
        status: RunStatus,
        log_message: &str,
        error_message: &str,
    ) -> Result<()> {
        if self.record.status().is_terminal() {
            return Err(Error::RunEnded {
                exp_id: self.exp_id(),
                status: self.record.status().to_string(),
            });
        }

        let at = clock::now();
        let row = match self.logs.last() {
            Some(last) => last.next(status, log_message, error_message, at),
            None => LogRecord::started(self.exp_id(), self.record.description(), at)
                .next(status, log_message, error_message, at),
        };
        self.logs.push(row);
        self.run_dir.write_logs(&self.logs)?;

        if status.is_terminal() {
            self.end_run(status, at)
        } else {
            self.record.set_status(status);
            self.save()
        }
    }

    /// Record the run's score and its deltas to the parent and benchmark.
    ///
    /// `decimals` defaults to the configured `score_decimals`.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the ledger cannot be written.
    pub fn log_score(
        &mut self,
        score_type: ScoreType,
        metric: &str,
        score: f64,
        decimals: Option<u32>,
    ) -> Result<()> {
        let decimals = decimals.unwrap_or(self.config.score_decimals);
        self.record.set_score(score_type, metric, score, decimals);
        debug!(exp_id = self.exp_id(), %score_type, metric, score, "logged score");
        self.save()
    }

    /// Save a table as `{name}.csv` in the run folder.
    ///
    /// Also records the folder under the `Artefacts` param.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the sheet or ledger cannot be written.
    pub fn log_artefact<T, I>(&mut self, name: &str, rows: I) -> Result<PathBuf>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let path = self.run_dir.write_table(name, rows)?;
        self.note_artefact(&path)?;
        Ok(path)
    }

    /// Save a feature importance table as `importance.csv`.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the sheet or ledger cannot be written.
    pub fn log_importance(&mut self, rows: &[FeatureImportance]) -> Result<PathBuf> {
        self.log_artefact(IMPORTANCE_ARTEFACT, rows)
    }

    /// Copy an existing CSV file into the run folder as `{name}.csv`.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the file cannot be copied or the ledger written.
    pub fn import_artefact(&mut self, name: &str, source: &Path) -> Result<PathBuf> {
        let path = self.run_dir.import_file(name, source)?;
        self.note_artefact(&path)?;
        Ok(path)
    }

    /// Add or replace a param.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the ledger cannot be written.
    pub fn log_param(&mut self, key: &str, value: impl Display) -> Result<()> {
        self.record.set_param(key, value.to_string());
        self.save()
    }

    /// Append an observation to the run's observations sheet.
    ///
    /// # Errors
    ///
    /// IO/CSV errors when the sheet cannot be written.
    pub fn observe(&self, text: &str) -> Result<()> {
        self.run_dir.append_observation(text)
    }

    fn note_artefact(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "saved artefact");
        let folder = self.run_dir.path().display().to_string();
        self.record.set_param(ARTEFACTS_PARAM, folder);
        self.save()
    }

    fn end_run(&mut self, status: RunStatus, at: chrono::NaiveDateTime) -> Result<()> {
        self.record.finish(status, at);
        self.save()?;
        info!(
            exp_id = self.exp_id(),
            %status,
            duration = ?self.record.duration().map(clock::format_duration),
            "All done: keep the observations and learnings artefacts updated"
        );
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut ledger = RunMaster::open(self.config.ledger_path())?;
        ledger.upsert(self.record.clone());
        ledger.save()
    }
}
