//! Error types for loading inputs and running an analysis

use crate::decomposition::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a decomposition or trace source
///
/// These are fatal for a run: no partial analysis is attempted on input that
/// failed to decode.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {kind} file {path}: {source}")]
    Io {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {kind} file {path}: {source}")]
    Parse {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {kind}: {source}")]
    ParseStr {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised at the analysis boundary, before any controller is scanned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Entity {entity} (access #{index} of controller '{controller}') is not assigned to a cluster")]
    UnknownEntity {
        controller: String,
        index: usize,
        entity: EntityId,
    },

    #[error("Determinism check failed: serial digest {serial} != parallel digest {parallel}")]
    NonDeterministic { serial: String, parallel: String },
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
