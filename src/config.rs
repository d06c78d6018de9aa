//! Project configuration
//!
//! Layered with figment, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `deepflow.toml` in the project root
//! 3. Environment variables prefixed with `DEEPFLOW_` (e.g. `DEEPFLOW_SCORE_DECIMALS=3`)

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::Result;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "deepflow.toml";

/// Where DeepFlow keeps its files and how it rounds numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepFlowConfig {
    /// Project root; the artefacts folder is created beneath it.
    pub root: PathBuf,
    /// Folder holding the overview sheets and every run folder.
    pub artefacts_dir: String,
    /// Sub-folder of `artefacts_dir` holding the ledger and project sheets.
    pub overview_dir: String,
    /// Ledger file name inside the overview folder.
    pub ledger_file: String,
    /// Default rounding for scores and deltas.
    pub score_decimals: u32,
    /// Rounding applied to metric columns when reporting.
    pub display_decimals: u32,
    /// Runs considered when aggregating feature importance.
    pub top_runs: usize,
    /// Features kept in importance summaries.
    pub top_features: usize,
}

impl Default for DeepFlowConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            artefacts_dir: "Artefacts".to_string(),
            overview_dir: "Overview".to_string(),
            ledger_file: "runmaster.csv".to_string(),
            score_decimals: 2,
            display_decimals: 4,
            top_runs: 5,
            top_features: 10,
        }
    }
}

impl DeepFlowConfig {
    /// Default configuration rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration for the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the TOML file or an env var
    /// holds a value of the wrong type.
    pub fn load(root: &Path) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::with_root(root)));

        let file = root.join(CONFIG_FILE);
        if file.exists() {
            figment = figment.merge(Toml::file(&file));
        }

        figment = figment.merge(Env::prefixed("DEEPFLOW_"));

        let mut config: Self = figment.extract()?;
        if config.root.is_relative() && config.root != root {
            config.root = root.join(&config.root);
        }
        Ok(config)
    }

    /// `<root>/<artefacts_dir>`
    #[must_use]
    pub fn artefacts_path(&self) -> PathBuf {
        self.root.join(&self.artefacts_dir)
    }

    /// `<root>/<artefacts_dir>/<overview_dir>`
    #[must_use]
    pub fn overview_path(&self) -> PathBuf {
        self.artefacts_path().join(&self.overview_dir)
    }

    /// Full path of the run master ledger.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.overview_path().join(&self.ledger_file)
    }

    /// Folder for one run: `exp_{id} - {description}`.
    #[must_use]
    pub fn run_path(&self, exp_id: u64, description: &str) -> PathBuf {
        self.artefacts_path().join(format!("exp_{exp_id} - {description}"))
    }
}
