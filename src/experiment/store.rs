//! Run master ledger - CSV-backed store of every run in a project
//!
//! The ledger is read whole and written whole. ExpIDs are assigned as
//! `max + 1`, so two processes starting runs at the same moment can
//! collide; the ledger assumes a single writer.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::run_record::LEDGER_COLUMNS;
use super::RunRecord;
use crate::{Error, Result};

/// Ordered collection of run records backed by a CSV file.
#[derive(Debug, Clone)]
pub struct RunMaster {
    path: PathBuf,
    runs: Vec<RunRecord>,
}

impl RunMaster {
    /// Empty ledger that will be written to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            runs: Vec::new(),
        }
    }

    /// Load the ledger at `path`, or start an empty one if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`] if a row cannot be parsed, naming the line.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "run master not found, starting empty");
            return Ok(Self::new(path));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut runs = Vec::new();
        for (index, row) in reader.deserialize::<RunRecord>().enumerate() {
            let run = row.map_err(|e| {
                // header is line 1
                Error::Ledger(format!("{}: row {}: {e}", path.display(), index + 2))
            })?;
            runs.push(run);
        }

        debug!(path = %path.display(), runs = runs.len(), "loaded run master");
        Ok(Self { path, runs })
    }

    /// Whether the ledger file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the ledger has no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Get the number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// All runs, in ledger order.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Get a run by ExpID.
    #[must_use]
    pub fn get(&self, exp_id: u64) -> Option<&RunRecord> {
        self.runs.iter().find(|run| run.exp_id() == exp_id)
    }

    /// Whether a run with this ExpID exists.
    #[must_use]
    pub fn contains(&self, exp_id: u64) -> bool {
        self.get(exp_id).is_some()
    }

    /// ExpID for the next run: 1 for an empty ledger, otherwise max + 1.
    #[must_use]
    pub fn next_exp_id(&self) -> u64 {
        self.runs
            .iter()
            .map(RunRecord::exp_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Whether `description` is already used (case-insensitive).
    #[must_use]
    pub fn has_description(&self, description: &str) -> bool {
        let wanted = description.to_lowercase();
        self.runs
            .iter()
            .any(|run| run.description().to_lowercase() == wanted)
    }

    /// Score of the given parent run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParentNotFound`] if no run has this ExpID.
    pub fn parent_score(&self, parent_id: u64) -> Result<Option<f64>> {
        self.get(parent_id)
            .map(RunRecord::score)
            .ok_or(Error::ParentNotFound(parent_id))
    }

    /// Check the ledger rules for a new run.
    ///
    /// The description must be unused. Once the ledger has runs, a new run
    /// must name a parent that exists; the first run's parent is ignored.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateDescription`], [`Error::MissingParent`] or
    /// [`Error::ParentNotFound`].
    pub fn validate_new_run(&self, description: &str, parent_id: Option<u64>) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.has_description(description) {
            return Err(Error::DuplicateDescription(description.to_string()));
        }
        let parent_id = parent_id.ok_or(Error::MissingParent)?;
        if !self.contains(parent_id) {
            return Err(Error::ParentNotFound(parent_id));
        }
        Ok(())
    }

    /// Replace the run with the same ExpID, or append it.
    pub fn upsert(&mut self, run: RunRecord) {
        match self.runs.iter_mut().find(|r| r.exp_id() == run.exp_id()) {
            Some(slot) => *slot = run,
            None => self.runs.push(run),
        }
    }

    /// ExpIDs from `exp_id` up through its ancestors to the root.
    ///
    /// Stops at a missing parent or a repeated ID.
    #[must_use]
    pub fn lineage(&self, exp_id: u64) -> Vec<u64> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(exp_id);
        while let Some(run) = current {
            if !seen.insert(run.exp_id()) {
                break;
            }
            chain.push(run.exp_id());
            current = run.parent_id().and_then(|parent| self.get(parent));
        }
        chain
    }

    /// Write every run to the ledger file, creating parent folders.
    ///
    /// The header is always written, even for an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        writer.write_record(LEDGER_COLUMNS)?;
        for run in &self.runs {
            writer.serialize(run)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), runs = self.runs.len(), "saved run master");
        Ok(())
    }
}
