//! Analysis configuration
//!
//! Settings can come from a TOML file (`--config frontera.toml`); command
//! line flags override them.
//!
//! # Example TOML
//! ```toml
//! [analysis]
//! execution = "parallel"
//! jobs = 8
//! unknown_entities = "reject"
//! controllers = "controllers=!/Test$/"
//!
//! [report]
//! format = "json"
//! skip_empty = true
//! complexity = true
//! ```

use crate::cli::OutputFormat;
use crate::coordinator::{AnalysisOptions, Execution, UnknownEntityPolicy};
use crate::filter::{ControllerFilter, FilterError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Dispatch strategy as written in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Serial,
    #[default]
    Parallel,
}

/// `[analysis]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub execution: ExecutionMode,

    /// Worker threads for parallel execution (default: available CPUs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    pub unknown_entities: UnknownEntityPolicy,

    /// Controller filter expression (e.g., "controllers=/^Student/")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controllers: Option<String>,
}

/// `[report]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub format: OutputFormat,

    /// Leave controllers without costly accesses out of the report
    pub skip_empty: bool,

    /// Compute the decomposition complexity
    pub complexity: bool,

    /// Include every costly event with its reason
    pub explain: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            skip_empty: false,
            complexity: false,
            explain: false,
        }
    }
}

/// Complete frontera configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FronteraConfig {
    pub analysis: AnalysisConfig,
    pub report: ReportConfig,
}

impl FronteraConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.jobs == Some(0) {
            return Err(ConfigError::Invalid(
                "analysis.jobs must be >= 1, got 0".to_string(),
            ));
        }

        if let (ExecutionMode::Serial, Some(jobs)) = (self.analysis.execution, self.analysis.jobs) {
            if jobs > 1 {
                return Err(ConfigError::Invalid(format!(
                    "analysis.jobs = {} conflicts with serial execution",
                    jobs
                )));
            }
        }

        Ok(())
    }

    /// Resolved dispatch strategy
    pub fn execution(&self) -> Execution {
        match (self.analysis.execution, self.analysis.jobs.and_then(NonZeroUsize::new)) {
            (ExecutionMode::Serial, _) => Execution::Serial,
            (ExecutionMode::Parallel, Some(jobs)) => Execution::Parallel(jobs),
            (ExecutionMode::Parallel, None) => Execution::parallel(),
        }
    }

    /// Build analysis options, parsing the controller filter
    pub fn analysis_options(&self) -> Result<AnalysisOptions, ConfigError> {
        let filter = match &self.analysis.controllers {
            Some(expr) => ControllerFilter::from_expr(expr)?,
            None => ControllerFilter::all(),
        };

        Ok(AnalysisOptions {
            execution: self.execution(),
            filter,
            unknown_entities: self.analysis.unknown_entities,
        })
    }
}
