//! Log Record - one row of a run's `logs.csv`

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::clock;
use super::RunStatus;

/// Status column of the log sheet: the run statuses plus the opening row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
    /// First row, written when the run is created.
    Started,
    /// Run is currently executing.
    Running,
    /// Run failed with an error.
    Failed,
    /// Run completed successfully.
    Completed,
}

impl From<RunStatus> for LogStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Running => Self::Running,
            RunStatus::Failed => Self::Failed,
            RunStatus::Completed => Self::Completed,
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Started => "Started",
            Self::Running => "Running",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
        };
        f.pad(text)
    }
}

/// Log Record represents one heartbeat or status change of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    #[serde(rename = "ExpID")]
    exp_id: u64,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Status")]
    status: LogStatus,
    #[serde(rename = "LogMessage", default)]
    log_message: String,
    #[serde(rename = "ErrorMessage", default)]
    error_message: String,
    #[serde(rename = "StartTime", with = "clock::opt_timestamp", default)]
    start_time: Option<NaiveDateTime>,
    #[serde(rename = "LogTime", with = "clock::opt_timestamp", default)]
    log_time: Option<NaiveDateTime>,
    #[serde(rename = "DurationSinceLog", with = "clock::opt_duration", default)]
    since_log: Option<Duration>,
    #[serde(rename = "DurationSinceStart", with = "clock::opt_duration", default)]
    since_start: Option<Duration>,
}

impl LogRecord {
    /// Opening row of a run, logged at its start time.
    #[must_use]
    pub fn started(exp_id: u64, description: impl Into<String>, start_time: NaiveDateTime) -> Self {
        Self {
            exp_id,
            description: description.into(),
            status: LogStatus::Started,
            log_message: String::new(),
            error_message: String::new(),
            start_time: Some(start_time),
            log_time: Some(start_time),
            since_log: None,
            since_start: None,
        }
    }

    /// Row following `self`, logged at `at`.
    ///
    /// Durations are measured from `self`'s log time and the run start.
    #[must_use]
    pub fn next(
        &self,
        status: RunStatus,
        log_message: impl Into<String>,
        error_message: impl Into<String>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            exp_id: self.exp_id,
            description: self.description.clone(),
            status: status.into(),
            log_message: log_message.into(),
            error_message: error_message.into(),
            start_time: self.start_time,
            log_time: Some(at),
            since_log: self.log_time.map(|t| at - t),
            since_start: self.start_time.map(|t| at - t),
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn exp_id(&self) -> u64 {
        self.exp_id
    }

    /// Get the logged status.
    #[must_use]
    pub const fn status(&self) -> LogStatus {
        self.status
    }

    /// Get the log message.
    #[must_use]
    pub fn log_message(&self) -> &str {
        &self.log_message
    }

    /// Get the error message.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Get the time this row was logged.
    #[must_use]
    pub const fn log_time(&self) -> Option<NaiveDateTime> {
        self.log_time
    }

    /// Get the time since the previous row.
    #[must_use]
    pub const fn since_log(&self) -> Option<Duration> {
        self.since_log
    }

    /// Get the time since the run started.
    #[must_use]
    pub const fn since_start(&self) -> Option<Duration> {
        self.since_start
    }
}
