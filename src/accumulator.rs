//! Controller access accumulator
//!
//! Collects, for one controller, every entity the controller was charged
//! for. Two views are kept:
//!
//! - the *costly mode*: the mode of the last costly access to the entity,
//!   which is the analysis result handed to the results sink;
//! - the *touch summary*: every mode the controller was ever charged under,
//!   used by the complexity metric to find conflicting controllers.

use crate::decomposition::EntityId;
use crate::mode::{AccessMode, ModeSummary};
use std::collections::BTreeMap;

/// Costly accesses of a single controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerAccesses {
    name: String,
    costly: BTreeMap<EntityId, AccessMode>,
    touched: BTreeMap<EntityId, ModeSummary>,
}

impl ControllerAccesses {
    /// Create an empty accumulator for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record a costly access
    ///
    /// The costly mode is overwritten with `mode`; the touch summary absorbs it.
    pub fn record(&mut self, entity: EntityId, mode: AccessMode) {
        self.costly.insert(entity, mode);
        self.touched
            .entry(entity)
            .and_modify(|summary| *summary = summary.merge(mode))
            .or_insert_with(|| ModeSummary::from(mode));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode under which `entity` was last deemed costly
    pub fn costly_mode(&self, entity: EntityId) -> Option<AccessMode> {
        self.costly.get(&entity).copied()
    }

    /// Every mode `entity` was charged under
    pub fn touch_summary(&self, entity: EntityId) -> Option<ModeSummary> {
        self.touched.get(&entity).copied()
    }

    /// Entity → costly mode, ordered by entity id
    pub fn costly(&self) -> &BTreeMap<EntityId, AccessMode> {
        &self.costly
    }

    pub fn touched(&self) -> &BTreeMap<EntityId, ModeSummary> {
        &self.touched
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.costly.keys().copied()
    }

    /// Number of distinct entities with at least one costly access
    pub fn len(&self) -> usize {
        self.costly.len()
    }

    /// True if the controller performed no costly access
    pub fn is_empty(&self) -> bool {
        self.costly.is_empty()
    }
}
