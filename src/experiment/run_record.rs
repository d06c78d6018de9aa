//! Run Record - one row of the run master ledger

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::clock;
use crate::{Error, Result};

/// Ledger columns in file order.
pub const LEDGER_COLUMNS: [&str; 16] = [
    "ProjectName",
    "ExpID",
    "ParentID",
    "Description",
    "StartTime",
    "EndTime",
    "Duration",
    "ScoreType",
    "Metric",
    "Score",
    "ParentScore",
    "ImprovementParent",
    "Benchmark",
    "ImprovementBenchmark",
    "Status",
    "Params",
];

/// Param key holding the run's artefact folder.
pub const ARTEFACTS_PARAM: &str = "Artefacts";

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunStatus {
    /// Run is currently executing.
    #[default]
    Running,
    /// Run failed with an error.
    Failed,
    /// Run completed successfully.
    Completed,
}

impl RunStatus {
    /// Completed and Failed close the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Name as written in the sheets.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Running" => Ok(Self::Running),
            "Failed" => Ok(Self::Failed),
            "Completed" => Ok(Self::Completed),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Kind of score a run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    /// Lower is better (RMSE, MAE, ...).
    Error,
    /// Higher is better (accuracy, F1, ...).
    Accuracy,
}

impl ScoreType {
    /// Whether `a` beats `b` under this score type.
    #[must_use]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Error => a < b,
            Self::Accuracy => a > b,
        }
    }

    /// Name as written in the sheets.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Accuracy => "accuracy",
        }
    }
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScoreType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "accuracy" => Ok(Self::Accuracy),
            _ => Err(Error::InvalidScoreType(s.to_string())),
        }
    }
}

/// Round half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    if !factor.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}

/// Run Record represents a single logged experiment execution.
///
/// Field order matches the ledger header; serde writes the columns in
/// this order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    #[serde(rename = "ProjectName")]
    project_name: String,
    #[serde(rename = "ExpID", deserialize_with = "lenient_exp_id")]
    exp_id: u64,
    #[serde(rename = "ParentID", deserialize_with = "lenient_id", default)]
    parent_id: Option<u64>,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "StartTime", with = "clock::opt_timestamp", default)]
    start_time: Option<NaiveDateTime>,
    #[serde(rename = "EndTime", with = "clock::opt_timestamp", default)]
    end_time: Option<NaiveDateTime>,
    #[serde(rename = "Duration", with = "clock::opt_duration", default)]
    duration: Option<Duration>,
    #[serde(rename = "ScoreType", default)]
    score_type: Option<ScoreType>,
    #[serde(rename = "Metric", default)]
    metric: Option<String>,
    #[serde(rename = "Score", default)]
    score: Option<f64>,
    #[serde(rename = "ParentScore", default)]
    parent_score: Option<f64>,
    #[serde(rename = "ImprovementParent", default)]
    improvement_parent: Option<f64>,
    #[serde(rename = "Benchmark", default)]
    benchmark: Option<f64>,
    #[serde(rename = "ImprovementBenchmark", default)]
    improvement_benchmark: Option<f64>,
    #[serde(rename = "Status")]
    status: RunStatus,
    #[serde(rename = "Params", with = "params_json", default)]
    params: BTreeMap<String, String>,
}

impl RunRecord {
    /// Create a new run record in Running status without a start time.
    ///
    /// # Arguments
    ///
    /// * `exp_id` - Ledger-assigned experiment ID
    /// * `project_name` - Project the run belongs to
    /// * `description` - Short, unique description of what changed
    #[must_use]
    pub fn new(exp_id: u64, project_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            exp_id,
            parent_id: None,
            description: description.into(),
            start_time: None,
            end_time: None,
            duration: None,
            score_type: None,
            metric: None,
            score: None,
            parent_score: None,
            improvement_parent: None,
            benchmark: None,
            improvement_benchmark: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing a run record with optional fields.
    #[must_use]
    pub fn builder(
        exp_id: u64,
        project_name: impl Into<String>,
        description: impl Into<String>,
    ) -> RunRecordBuilder {
        RunRecordBuilder::new(exp_id, project_name, description)
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn exp_id(&self) -> u64 {
        self.exp_id
    }

    /// Get the parent experiment ID, if this run branched from one.
    #[must_use]
    pub const fn parent_id(&self) -> Option<u64> {
        self.parent_id
    }

    /// Get the project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    /// Get the end timestamp, once the run has ended.
    #[must_use]
    pub const fn end_time(&self) -> Option<NaiveDateTime> {
        self.end_time
    }

    /// Get the run duration, once the run has ended.
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Get the score type.
    #[must_use]
    pub const fn score_type(&self) -> Option<ScoreType> {
        self.score_type
    }

    /// Get the metric name (upper-case).
    #[must_use]
    pub fn metric(&self) -> Option<&str> {
        self.metric.as_deref()
    }

    /// Get the score.
    #[must_use]
    pub const fn score(&self) -> Option<f64> {
        self.score
    }

    /// Get the parent's score at the time this run started.
    #[must_use]
    pub const fn parent_score(&self) -> Option<f64> {
        self.parent_score
    }

    /// Get `score - parent_score`.
    #[must_use]
    pub const fn improvement_parent(&self) -> Option<f64> {
        self.improvement_parent
    }

    /// Get the benchmark score.
    #[must_use]
    pub const fn benchmark(&self) -> Option<f64> {
        self.benchmark
    }

    /// Get `score - benchmark`.
    #[must_use]
    pub const fn improvement_benchmark(&self) -> Option<f64> {
        self.improvement_benchmark
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the params mapping.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Get a single param.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Start the run at `at`, status Running.
    pub fn start(&mut self, at: NaiveDateTime) {
        self.status = RunStatus::Running;
        self.start_time = Some(at);
        self.end_time = None;
        self.duration = None;
    }

    /// Update the status without closing the run.
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Close the run at `at` with the given final status.
    ///
    /// Sets the end timestamp and the duration since start.
    pub fn finish(&mut self, status: RunStatus, at: NaiveDateTime) {
        self.status = status;
        self.end_time = Some(at);
        self.duration = self.start_time.map(|start| at - start);
    }

    /// Record the parent's score used for the parent delta.
    pub fn set_parent_score(&mut self, parent_score: Option<f64>) {
        self.parent_score = parent_score;
    }

    /// Record the score and recompute both deltas.
    ///
    /// The score and deltas are rounded to `decimals`; a delta stays empty
    /// when its reference value is empty.
    pub fn set_score(&mut self, score_type: ScoreType, metric: &str, score: f64, decimals: u32) {
        self.score_type = Some(score_type);
        self.metric = Some(metric.to_uppercase());
        self.score = Some(round_to(score, decimals));
        self.improvement_parent = self.parent_score.map(|p| round_to(score - p, decimals));
        self.improvement_benchmark = self.benchmark.map(|b| round_to(score - b, decimals));
    }

    /// Add or replace a param.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    record: RunRecord,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(exp_id: u64, project_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            record: RunRecord::new(exp_id, project_name, description),
        }
    }

    /// Set the parent experiment and its score.
    #[must_use]
    pub const fn parent(mut self, parent_id: u64, parent_score: Option<f64>) -> Self {
        self.record.parent_id = Some(parent_id);
        self.record.parent_score = parent_score;
        self
    }

    /// Set the benchmark to beat.
    #[must_use]
    pub const fn benchmark(mut self, benchmark: f64) -> Self {
        self.record.benchmark = Some(benchmark);
        self
    }

    /// Set the initial params.
    #[must_use]
    pub fn params(mut self, params: BTreeMap<String, String>) -> Self {
        self.record.params = params;
        self
    }

    /// Set the start time.
    #[must_use]
    pub const fn start_time(mut self, at: NaiveDateTime) -> Self {
        self.record.start_time = Some(at);
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(self) -> RunRecord {
        self.record
    }
}

/// Accept `3`, `3.0` and empty cells for ID columns. Sheets written by
/// dataframe tools store a nullable integer column as floats.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u64>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    parse_lenient_id(&text).map_err(serde::de::Error::custom)
}

/// Same forms as `lenient_id`, but the cell must hold an ID.
fn lenient_exp_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_lenient_id(&text)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("missing ExpID"))
}

pub(crate) fn parse_lenient_id(text: &str) -> std::result::Result<Option<u64>, String> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(id) = text.parse::<u64>() {
        return Ok(Some(id));
    }
    match text.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as u64)),
        _ => Err(format!("invalid experiment ID '{text}'")),
    }
}

/// Params column: a JSON object of string values in one cell.
mod params_json {
    use std::collections::BTreeMap;

    use super::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        params: &BTreeMap<String, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = serde_json::to_string(params).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(serde::de::Error::custom)?;
        let serde_json::Value::Object(map) = value else {
            return Err(serde::de::Error::custom("Params must be a JSON object"));
        };
        Ok(map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect())
    }
}
