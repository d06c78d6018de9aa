//! Error types for DeepFlow
//!
//! Every ledger rule violation gets its own variant so callers (and the CLI)
//! can tell a bad request apart from a broken file.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DeepFlow error types
#[derive(Error, Debug)]
pub enum Error {
    /// Description already used by another run (compared case-insensitively)
    #[error("Experiment description must be unique: '{0}' is already in the run master")]
    DuplicateDescription(String),

    /// A ledger with existing runs needs every new run to name its parent
    #[error("Please provide a parent ExpID: the run master already has experiments")]
    MissingParent,

    /// Parent ID does not match any run in the ledger
    #[error("Parent ID {0} not found in existing experiments")]
    ParentNotFound(u64),

    /// Status text outside Running/Failed/Completed
    #[error("Status should be 'Running', 'Failed' or 'Completed', '{0}' was passed")]
    InvalidStatus(String),

    /// Score type outside Error/Accuracy
    #[error("Expected 'Error' or 'Accuracy' for score type, '{0}' was passed")]
    InvalidScoreType(String),

    /// No run with this ExpID in the ledger
    #[error("Experiment {0} not found in the run master")]
    RunNotFound(u64),

    /// Run already reached Completed or Failed
    #[error("Experiment {exp_id} has already ended with status {status}")]
    RunEnded {
        /// Run that was already closed
        exp_id: u64,
        /// Terminal status it ended with
        status: String,
    },

    /// Caller passed an unusable argument (e.g. k = 0)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ledger file exists but a row could not be interpreted
    #[error("Run master error: {0}")]
    Ledger(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Params column JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
