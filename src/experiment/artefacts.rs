//! Artefact sheets - per-run folders and project overview sheets
//!
//! ```text
//! Artefacts/
//! ├── Overview/
//! │   ├── runmaster.csv
//! │   ├── learnings.csv       (Learnings)
//! │   └── observations.csv    (Observations)
//! └── exp_{ExpID} - {Description}/
//!     ├── logs.csv
//!     ├── observations.csv
//!     └── {name}.csv          (any logged artefact, e.g. importance.csv)
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LogRecord;
use crate::{Error, Result};

/// Header of the learnings sheet.
pub const LEARNINGS_COLUMN: &str = "Learnings";
/// Header of both observations sheets.
pub const OBSERVATIONS_COLUMN: &str = "Observations";
/// Artefact name for feature importance tables.
pub const IMPORTANCE_ARTEFACT: &str = "importance";

const LOGS_FILE: &str = "logs.csv";
const OBSERVATIONS_FILE: &str = "observations.csv";
const LEARNINGS_FILE: &str = "learnings.csv";

/// One row of a feature importance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name.
    #[serde(rename = "Feature")]
    pub feature: String,
    /// Importance weight; any non-negative scale.
    #[serde(rename = "Importance")]
    pub importance: f64,
}

impl FeatureImportance {
    /// Create a row.
    #[must_use]
    pub fn new(feature: impl Into<String>, importance: f64) -> Self {
        Self {
            feature: feature.into(),
            importance,
        }
    }
}

/// A folder of CSV sheets (a run folder or the overview folder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactDir {
    path: PathBuf,
}

impl ArtefactDir {
    /// Wrap an existing or future folder.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Folder path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `{name}.csv` inside the folder.
    #[must_use]
    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}.csv"))
    }

    /// Create the folder and its parents.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the folder cannot be created.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// Overview folder: write header-only learnings and observations sheets.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if a sheet cannot be written.
    pub fn init_overview(&self) -> Result<()> {
        self.create()?;
        write_header_only(&self.path.join(LEARNINGS_FILE), LEARNINGS_COLUMN)?;
        write_header_only(&self.path.join(OBSERVATIONS_FILE), OBSERVATIONS_COLUMN)
    }

    /// Run folder: write a header-only observations sheet.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the sheet cannot be written.
    pub fn init_run(&self) -> Result<()> {
        self.create()?;
        write_header_only(&self.path.join(OBSERVATIONS_FILE), OBSERVATIONS_COLUMN)
    }

    /// Save `rows` as `{name}.csv`, replacing any previous sheet.
    ///
    /// Returns the written path. An empty table produces an empty file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a name that is not a plain file
    /// name, or an IO or CSV error if the sheet cannot be written.
    pub fn write_table<T, I>(&self, name: &str, rows: I) -> Result<PathBuf>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        check_path_component("artefact name", name)?;
        self.create()?;
        let path = self.sheet_path(name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), "wrote artefact");
        Ok(path)
    }

    /// Copy an existing CSV file in as `{name}.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a name that is not a plain file
    /// name, or an IO error if the source cannot be copied.
    pub fn import_file(&self, name: &str, source: &Path) -> Result<PathBuf> {
        check_path_component("artefact name", name)?;
        self.create()?;
        let path = self.sheet_path(name);
        fs::copy(source, &path)?;
        debug!(from = %source.display(), to = %path.display(), "imported artefact");
        Ok(path)
    }

    /// Rewrite `logs.csv` with every log row.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the sheet cannot be written.
    pub fn write_logs(&self, logs: &[LogRecord]) -> Result<()> {
        self.write_table("logs", logs).map(|_| ())
    }

    /// Read `logs.csv`; a missing sheet reads as no rows.
    ///
    /// # Errors
    ///
    /// Returns a CSV error if a row cannot be parsed.
    pub fn read_logs(&self) -> Result<Vec<LogRecord>> {
        let path = self.path.join(LOGS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .map_err(Error::from)
    }

    /// Append one observation, creating the sheet if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the sheet cannot be written.
    pub fn append_observation(&self, text: &str) -> Result<()> {
        append_single(&self.path.join(OBSERVATIONS_FILE), OBSERVATIONS_COLUMN, text)
    }

    /// Append one learning, creating the sheet if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO or CSV error if the sheet cannot be written.
    pub fn append_learning(&self, text: &str) -> Result<()> {
        append_single(&self.path.join(LEARNINGS_FILE), LEARNINGS_COLUMN, text)
    }

    /// Observations in sheet order; a missing sheet reads as none.
    ///
    /// # Errors
    ///
    /// Returns a CSV error if the sheet cannot be read.
    pub fn observations(&self) -> Result<Vec<String>> {
        read_single(&self.path.join(OBSERVATIONS_FILE))
    }

    /// Learnings in sheet order; a missing sheet reads as none.
    ///
    /// # Errors
    ///
    /// Returns a CSV error if the sheet cannot be read.
    pub fn learnings(&self) -> Result<Vec<String>> {
        read_single(&self.path.join(LEARNINGS_FILE))
    }

    /// Whether the folder has a feature importance sheet.
    #[must_use]
    pub fn has_importance(&self) -> bool {
        self.sheet_path(IMPORTANCE_ARTEFACT).exists()
    }

    /// Read the feature importance sheet.
    ///
    /// Headers are matched case-insensitively (`feature`, `Feature`, ...);
    /// other columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if either column is missing, or a CSV error.
    pub fn read_importance(&self) -> Result<Vec<FeatureImportance>> {
        let path = self.sheet_path(IMPORTANCE_ARTEFACT);
        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    Error::Other(format!("{}: missing '{name}' column", path.display()))
                })
        };
        let feature_col = find("feature")?;
        let importance_col = find("importance")?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let feature = record.get(feature_col).unwrap_or_default().to_string();
            let raw = record.get(importance_col).unwrap_or_default().trim();
            let importance = raw.parse::<f64>().map_err(|e| {
                Error::Other(format!("{}: bad importance '{raw}': {e}", path.display()))
            })?;
            rows.push(FeatureImportance::new(feature, importance));
        }
        Ok(rows)
    }
}

/// `name` must stay a single component inside its parent folder.
pub(crate) fn check_path_component(what: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "{what} '{name}' must not be empty or contain path separators"
        )));
    }
    Ok(())
}

fn write_header_only(path: &Path, column: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([column])?;
    writer.flush()?;
    Ok(())
}

fn append_single(path: &Path, column: &str, text: &str) -> Result<()> {
    let fresh = !path.exists() || fs::metadata(path)?.len() == 0;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    if fresh {
        writer.write_record([column])?;
    }
    writer.write_record([text])?;
    writer.flush()?;
    Ok(())
}

fn read_single(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(0) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_run_writes_blank_observations() {
        let dir = tempfile::tempdir().unwrap();
        let run = ArtefactDir::new(dir.path().join("exp_1 - baseline"));
        run.init_run().unwrap();

        let text = fs::read_to_string(run.path().join(OBSERVATIONS_FILE)).unwrap();
        assert_eq!(text.trim(), OBSERVATIONS_COLUMN);
        assert!(run.observations().unwrap().is_empty());
    }

    #[test]
    fn test_append_observation() {
        let dir = tempfile::tempdir().unwrap();
        let overview = ArtefactDir::new(dir.path());
        overview.init_overview().unwrap();
        overview.append_observation("lags help, a lot").unwrap();
        overview.append_learning("drop id columns").unwrap();

        assert_eq!(overview.observations().unwrap(), vec!["lags help, a lot"]);
        assert_eq!(overview.learnings().unwrap(), vec!["drop id columns"]);
    }

    #[test]
    fn test_importance_headers_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let run = ArtefactDir::new(dir.path());
        fs::write(
            run.sheet_path(IMPORTANCE_ARTEFACT),
            "FEATURE,importance,rank\nlag_1,3.5,1\nlag_2,1,2\n",
        )
        .unwrap();

        let rows = run.read_importance().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], FeatureImportance::new("lag_1", 3.5));
    }

    #[test]
    fn test_write_table_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let run = ArtefactDir::new(dir.path());
        let rows: Vec<FeatureImportance> = Vec::new();
        assert!(run.write_table("../escape", rows).is_err());
    }

    #[test]
    fn test_import_file_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.csv");
        fs::write(&source, "Feature,Importance\nlag_1,1\n").unwrap();
        let run = ArtefactDir::new(dir.path().join("Artefacts/exp_1 - baseline"));

        for name in ["../../escaped", "nested/sheet", "..\\up", "", ".."] {
            let result = run.import_file(name, &source);
            assert!(matches!(result, Err(Error::InvalidInput(_))), "accepted '{name}'");
        }
        assert!(!dir.path().join("escaped.csv").exists());

        let path = run.import_file(IMPORTANCE_ARTEFACT, &source).unwrap();
        assert_eq!(path, run.sheet_path(IMPORTANCE_ARTEFACT));
        assert!(run.has_importance());
    }
}
