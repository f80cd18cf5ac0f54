use super::{ClusterId, Decomposition, EntityId};
use crate::error::LoadError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const KIND: &str = "decomposition";

/// On-disk layout of a decomposition source ("cut" file)
///
/// Only the `clusters` table is read; any other top-level keys produced by
/// the tool that computed the cut are ignored.
#[derive(Debug, Deserialize)]
struct DecompositionFile {
    clusters: BTreeMap<ClusterId, Vec<EntityId>>,
}

impl Decomposition {
    /// Load a decomposition from a JSON cut file
    ///
    /// # Example JSON
    /// ```json
    /// { "clusters": { "0": [1, 2], "1": [3] } }
    /// ```
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid JSON, or has a
    /// cluster id / entity id that is not an integer.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            kind: KIND,
            path: path.to_path_buf(),
            source,
        })?;

        let file: DecompositionFile =
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                kind: KIND,
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(
            "Loaded {} clusters from {}",
            file.clusters.len(),
            path.display()
        );
        Ok(Self::from_clusters(file.clusters))
    }

    /// Decode a decomposition from an in-memory JSON document
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let file: DecompositionFile = serde_json::from_str(json)
            .map_err(|source| LoadError::ParseStr { kind: KIND, source })?;
        Ok(Self::from_clusters(file.clusters))
    }
}
