//! Controller access traces
//!
//! A trace is the ordered sequence of entity accesses a controller performs
//! during one representative execution. Traces are decoded from the
//! collector's datafile format:
//!
//! ```json
//! {
//!   "StudentController.enrol": { "t": [ { "id": 0, "a": [["R", 12], ["W", 7]] } ] }
//! }
//! ```
//!
//! Malformed entries (a mode other than `"R"`/`"W"`, a non-integer entity id,
//! an access that is not a two-element array) are rejected here, so the
//! scanner only ever sees well-formed accesses.

use crate::decomposition::EntityId;
use crate::error::LoadError;
use crate::mode::AccessMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const KIND: &str = "trace";

/// One `(mode, entity)` event of a trace
///
/// Encoded as the two-element array `["R", 12]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(AccessMode, EntityId)", into = "(AccessMode, EntityId)")]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct Access {
    pub mode: AccessMode,
    pub entity: EntityId,
}

impl Access {
    pub fn new(mode: AccessMode, entity: EntityId) -> Self {
        Self { mode, entity }
    }

    pub fn read(entity: EntityId) -> Self {
        Self::new(AccessMode::Read, entity)
    }

    pub fn write(entity: EntityId) -> Self {
        Self::new(AccessMode::Write, entity)
    }
}

impl From<(AccessMode, EntityId)> for Access {
    fn from((mode, entity): (AccessMode, EntityId)) -> Self {
        Self { mode, entity }
    }
}

impl From<Access> for (AccessMode, EntityId) {
    fn from(access: Access) -> Self {
        (access.mode, access.entity)
    }
}

/// Ordered, read-only access sequence of one controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTrace {
    accesses: Vec<Access>,
}

impl AccessTrace {
    pub fn new(accesses: Vec<Access>) -> Self {
        Self { accesses }
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    pub fn len(&self) -> usize {
        self.accesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accesses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Access> {
        self.accesses.iter()
    }
}

impl FromIterator<Access> for AccessTrace {
    fn from_iter<I: IntoIterator<Item = Access>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AccessTrace {
    type Item = &'a Access;
    type IntoIter = std::slice::Iter<'a, Access>;

    fn into_iter(self) -> Self::IntoIter {
        self.accesses.iter()
    }
}

/// Per-controller record of the datafile
#[derive(Debug, Deserialize)]
struct ControllerRecord {
    #[serde(rename = "t", default)]
    traces: Vec<TraceRecord>,
}

#[derive(Debug, Deserialize)]
struct TraceRecord {
    #[serde(rename = "a", default)]
    accesses: AccessTrace,
}

/// Representative trace of every controller, keyed by controller name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSet {
    traces: BTreeMap<String, AccessTrace>,
}

impl TraceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load traces from a datafile
    ///
    /// The first trace listed for a controller is its representative trace.
    /// A controller without traces gets an empty one.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or any entry is malformed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            kind: KIND,
            path: path.to_path_buf(),
            source,
        })?;

        let records: BTreeMap<String, ControllerRecord> =
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                kind: KIND,
                path: path.to_path_buf(),
                source,
            })?;

        let set = Self::from_records(records);
        tracing::info!(
            "Loaded traces for {} controllers ({} accesses) from {}",
            set.len(),
            set.total_accesses(),
            path.display()
        );
        Ok(set)
    }

    /// Decode traces from an in-memory datafile document
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let records: BTreeMap<String, ControllerRecord> = serde_json::from_str(json)
            .map_err(|source| LoadError::ParseStr { kind: KIND, source })?;
        Ok(Self::from_records(records))
    }

    fn from_records(records: BTreeMap<String, ControllerRecord>) -> Self {
        let traces = records
            .into_iter()
            .map(|(name, record)| {
                if record.traces.len() > 1 {
                    tracing::debug!(
                        "Controller {} has {} traces; using the first",
                        name,
                        record.traces.len()
                    );
                }
                let trace = record
                    .traces
                    .into_iter()
                    .next()
                    .map(|t| t.accesses)
                    .unwrap_or_default();
                (name, trace)
            })
            .collect();
        Self { traces }
    }

    pub fn insert(&mut self, controller: impl Into<String>, trace: AccessTrace) {
        self.traces.insert(controller.into(), trace);
    }

    pub fn get(&self, controller: &str) -> Option<&AccessTrace> {
        self.traces.get(controller)
    }

    /// Iterate controllers in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccessTrace)> {
        self.traces.iter().map(|(name, trace)| (name.as_str(), trace))
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Total number of accesses over all controllers
    pub fn total_accesses(&self) -> usize {
        self.traces.values().map(AccessTrace::len).sum()
    }
}

impl FromIterator<(String, AccessTrace)> for TraceSet {
    fn from_iter<I: IntoIterator<Item = (String, AccessTrace)>>(iter: I) -> Self {
        Self {
            traces: iter.into_iter().collect(),
        }
    }
}
