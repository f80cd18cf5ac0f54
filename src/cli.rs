//! CLI argument parsing for Frontera

use crate::config::{ExecutionMode, FronteraConfig};
use crate::coordinator::UnknownEntityPolicy;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text summary (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "frontera")]
#[command(version)]
#[command(
    about = "Costly-access analysis for candidate microservice decompositions",
    long_about = None
)]
pub struct Cli {
    /// Decomposition (cut) file: {"clusters": {"<id>": [entity ids]}}
    #[arg(short = 'd', long = "decomposition", value_name = "FILE")]
    pub decomposition: PathBuf,

    /// Access trace datafile: {"<controller>": {"t": [{"a": [["R", id], ...]}]}}
    #[arg(short = 't', long = "traces", value_name = "FILE")]
    pub traces: PathBuf,

    /// TOML configuration file (flags override its values)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Filter controllers to analyse (e.g., -e controllers=A,/^Student/,!/Test$/)
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Scan controllers on a single thread
    #[arg(long = "serial", conflicts_with = "jobs")]
    pub serial: bool,

    /// Worker threads for parallel scanning (default: available CPUs)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Fail if a trace references an entity outside the decomposition
    #[arg(long = "reject-unknown")]
    pub reject_unknown: bool,

    /// Leave controllers without costly accesses out of the report
    #[arg(long = "skip-empty")]
    pub skip_empty: bool,

    /// Compute the decomposition complexity
    #[arg(long = "complexity")]
    pub complexity: bool,

    /// List every costly access with the reason it is costly
    #[arg(long = "explain")]
    pub explain: bool,

    /// Run serial and parallel analyses and fail if they disagree
    #[arg(long = "verify-determinism")]
    pub verify_determinism: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Override configuration values with the flags given on the command line
    pub fn apply(&self, config: &mut FronteraConfig) {
        if self.serial {
            config.analysis.execution = ExecutionMode::Serial;
            config.analysis.jobs = None;
        }
        if let Some(jobs) = self.jobs {
            config.analysis.execution = ExecutionMode::Parallel;
            config.analysis.jobs = Some(jobs);
        }
        if self.reject_unknown {
            config.analysis.unknown_entities = UnknownEntityPolicy::Reject;
        }
        if let Some(expr) = &self.filter {
            config.analysis.controllers = Some(expr.clone());
        }
        if let Some(format) = self.format {
            config.report.format = format;
        }
        config.report.skip_empty |= self.skip_empty;
        config.report.complexity |= self.complexity;
        config.report.explain |= self.explain;
    }
}
