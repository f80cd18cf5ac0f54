//! Access modes for entity accesses
//!
//! A controller touches an entity either for reading or for writing. The two
//! modes form a total order (`Read < Write`): moving up the order inside one
//! cluster run is a *mode escalation* and forces a fresh, exclusive fetch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mode of a single entity access
///
/// Serialized as the trace mode strings `"R"` and `"W"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum AccessMode {
    #[serde(rename = "R")]
    Read,
    #[serde(rename = "W")]
    Write,
}

impl AccessMode {
    /// Trace representation of this mode
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Read => "R",
            AccessMode::Write => "W",
        }
    }

    /// True if moving from `self` to `next` requires a stronger fetch
    pub fn escalates_to(self, next: AccessMode) -> bool {
        self < next
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode string is neither `R` nor `W`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid access mode '{0}' (expected \"R\" or \"W\")")]
pub struct ModeParseError(pub String);

impl FromStr for AccessMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R" => Ok(AccessMode::Read),
            "W" => Ok(AccessMode::Write),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// Every mode under which a controller was charged for an entity
///
/// Unlike [`AccessMode`], a summary can hold both modes at once once a
/// controller has been charged for reading and for writing the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeSummary {
    #[serde(rename = "R")]
    Read,
    #[serde(rename = "W")]
    Write,
    #[serde(rename = "RW")]
    ReadWrite,
}

impl ModeSummary {
    /// Fold another access mode into the summary
    pub fn merge(self, mode: AccessMode) -> Self {
        match (self, mode) {
            (ModeSummary::Read, AccessMode::Read) => ModeSummary::Read,
            (ModeSummary::Write, AccessMode::Write) => ModeSummary::Write,
            _ => ModeSummary::ReadWrite,
        }
    }

    /// True if the summary is exactly the single mode `mode`
    pub fn is_only(self, mode: AccessMode) -> bool {
        self == ModeSummary::from(mode)
    }
}

impl From<AccessMode> for ModeSummary {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Read => ModeSummary::Read,
            AccessMode::Write => ModeSummary::Write,
        }
    }
}

impl fmt::Display for ModeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModeSummary::Read => "R",
            ModeSummary::Write => "W",
            ModeSummary::ReadWrite => "RW",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_ordering() {
        assert!(AccessMode::Read < AccessMode::Write);
        assert!(AccessMode::Read.escalates_to(AccessMode::Write));
        assert!(!AccessMode::Write.escalates_to(AccessMode::Read));
        assert!(!AccessMode::Read.escalates_to(AccessMode::Read));
        assert!(!AccessMode::Write.escalates_to(AccessMode::Write));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("R".parse::<AccessMode>(), Ok(AccessMode::Read));
        assert_eq!("W".parse::<AccessMode>(), Ok(AccessMode::Write));
        assert!("RW".parse::<AccessMode>().is_err());
        assert!("r".parse::<AccessMode>().is_err());
        assert!("".parse::<AccessMode>().is_err());
    }

    #[test]
    fn test_mode_serde_uses_trace_strings() {
        assert_eq!(serde_json::to_string(&AccessMode::Read).unwrap(), "\"R\"");
        assert_eq!(serde_json::to_string(&AccessMode::Write).unwrap(), "\"W\"");
        let parsed: AccessMode = serde_json::from_str("\"W\"").unwrap();
        assert_eq!(parsed, AccessMode::Write);
        assert!(serde_json::from_str::<AccessMode>("\"X\"").is_err());
    }

    #[test]
    fn test_summary_merge() {
        let s = ModeSummary::from(AccessMode::Read);
        assert_eq!(s.merge(AccessMode::Read), ModeSummary::Read);
        assert_eq!(s.merge(AccessMode::Write), ModeSummary::ReadWrite);
        assert_eq!(
            ModeSummary::Write.merge(AccessMode::Read),
            ModeSummary::ReadWrite
        );
        // RW is absorbing
        assert_eq!(
            ModeSummary::ReadWrite.merge(AccessMode::Write),
            ModeSummary::ReadWrite
        );
    }

    #[test]
    fn test_summary_is_only() {
        assert!(ModeSummary::Read.is_only(AccessMode::Read));
        assert!(!ModeSummary::Read.is_only(AccessMode::Write));
        assert!(!ModeSummary::ReadWrite.is_only(AccessMode::Read));
        assert!(!ModeSummary::ReadWrite.is_only(AccessMode::Write));
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessMode::Write.to_string(), "W");
        assert_eq!(ModeSummary::ReadWrite.to_string(), "RW");
    }
}
