//! Costly-access scanner
//!
//! Walks one controller's trace once and decides, for every access, whether
//! it represents real cost under the decomposition:
//!
//! - the first access of the trace is always costly;
//! - an access landing in a different cluster than the previous access is
//!   always costly and starts a new *run* (the data lives in another store);
//! - inside a run, an access is costly only if the entity was not fetched yet
//!   in this run, or it was fetched for reading and is now written
//!   (mode escalation). Re-reads, re-writes and reads after a write are free.
//!
//! # Example
//!
//! ```
//! use frontera::decomposition::Decomposition;
//! use frontera::mode::AccessMode;
//! use frontera::scanner::scan_controller;
//! use frontera::trace::{Access, AccessTrace};
//!
//! let decomposition = Decomposition::from_clusters([(0, vec![1, 2]), (1, vec![3])]);
//! let trace: AccessTrace = [Access::read(1), Access::read(1), Access::write(1)]
//!     .into_iter()
//!     .collect();
//!
//! let scan = scan_controller("X", &trace, &decomposition);
//! assert_eq!(scan.events.len(), 2); // first access + R→W escalation
//! assert_eq!(scan.accesses.costly_mode(1), Some(AccessMode::Write));
//! ```

use crate::accumulator::ControllerAccesses;
use crate::decomposition::{ClusterKey, Decomposition, EntityId};
use crate::mode::AccessMode;
use crate::trace::{Access, AccessTrace};
use fnv::FnvHashMap;
use serde::Serialize;

/// Why an access was deemed costly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostReason {
    /// First access of the trace
    First,
    /// Entity not fetched yet in the current run
    NewEntity,
    /// Entity fetched for reading in this run, now written
    Escalation,
    /// Access crosses into a different cluster
    ClusterTransition,
}

/// A costly access and where it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostlyEvent {
    /// Position of the access in the trace
    pub index: usize,
    pub access: Access,
    pub cluster: ClusterKey,
    pub reason: CostReason,
    /// Ordinal of the contiguous same-cluster run the access belongs to
    pub run: usize,
}

/// Costly accesses of one contiguous same-cluster run
///
/// A controller executes as a sequence of local transactions, one per visit
/// to a cluster; each transaction fetches exactly its costly accesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalTransaction {
    pub cluster: ClusterKey,
    pub accesses: Vec<Access>,
}

/// Result of scanning one controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerScan {
    pub accesses: ControllerAccesses,
    /// Costly events in trace order
    pub events: Vec<CostlyEvent>,
}

impl ControllerScan {
    pub fn name(&self) -> &str {
        self.accesses.name()
    }

    /// Number of costly accesses (not distinct entities)
    pub fn costly_count(&self) -> usize {
        self.events.len()
    }

    /// True if the access at trace position `index` was costly
    pub fn is_costly(&self, index: usize) -> bool {
        self.events
            .binary_search_by_key(&index, |event| event.index)
            .is_ok()
    }

    /// Group costly events into per-cluster local transactions
    pub fn local_transactions(&self) -> Vec<LocalTransaction> {
        let mut transactions: Vec<LocalTransaction> = Vec::new();
        let mut current_run = None;

        for event in &self.events {
            if current_run != Some(event.run) {
                current_run = Some(event.run);
                transactions.push(LocalTransaction {
                    cluster: event.cluster,
                    accesses: Vec::new(),
                });
            }
            if let Some(transaction) = transactions.last_mut() {
                transaction.accesses.push(event.access);
            }
        }

        transactions
    }
}

/// Incremental scanner over one controller's trace
///
/// Feed accesses in trace order with [`push`](Self::push), then take the
/// result with [`finish`](Self::finish).
#[derive(Debug)]
pub struct CostlyAccessScanner<'a> {
    decomposition: &'a Decomposition,

    /// Cluster of the previous access; `None` before the first access
    previous: Option<ClusterKey>,

    /// Modes fetched in the current run, cleared on every cluster change
    recent_modes: FnvHashMap<EntityId, AccessMode>,

    run: usize,
    index: usize,
    scan: ControllerScan,
}

impl<'a> CostlyAccessScanner<'a> {
    pub fn new(controller: impl Into<String>, decomposition: &'a Decomposition) -> Self {
        Self {
            decomposition,
            previous: None,
            recent_modes: FnvHashMap::default(),
            run: 0,
            index: 0,
            scan: ControllerScan {
                accesses: ControllerAccesses::new(controller),
                events: Vec::new(),
            },
        }
    }

    /// Process the next access; returns the reason if it is costly
    pub fn push(&mut self, access: Access) -> Option<CostReason> {
        let cluster = self.decomposition.cluster_key(access.entity);

        let reason = match self.previous {
            None => {
                self.recent_modes.clear();
                Some(CostReason::First)
            }
            Some(previous) if previous == cluster => {
                match self.recent_modes.get(&access.entity) {
                    None => Some(CostReason::NewEntity),
                    Some(saved) if saved.escalates_to(access.mode) => Some(CostReason::Escalation),
                    Some(_) => None,
                }
            }
            Some(_) => {
                self.run += 1;
                self.recent_modes.clear();
                Some(CostReason::ClusterTransition)
            }
        };

        if let Some(reason) = reason {
            self.recent_modes.insert(access.entity, access.mode);
            self.scan.accesses.record(access.entity, access.mode);
            self.scan.events.push(CostlyEvent {
                index: self.index,
                access,
                cluster,
                reason,
                run: self.run,
            });
        }

        self.previous = Some(cluster);
        self.index += 1;
        reason
    }

    /// Finish the scan and hand back the controller's result
    pub fn finish(self) -> ControllerScan {
        self.scan
    }
}

/// Scan a complete trace
pub fn scan_controller(
    controller: &str,
    trace: &AccessTrace,
    decomposition: &Decomposition,
) -> ControllerScan {
    let mut scanner = CostlyAccessScanner::new(controller, decomposition);
    for access in trace {
        scanner.push(*access);
    }
    scanner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decomposition() -> Decomposition {
        Decomposition::from_clusters([(0, vec![1, 2]), (1, vec![3])])
    }

    fn trace(accesses: &[Access]) -> AccessTrace {
        accesses.iter().copied().collect()
    }

    fn reasons(scan: &ControllerScan) -> Vec<(usize, CostReason)> {
        scan.events.iter().map(|e| (e.index, e.reason)).collect()
    }

    #[test]
    fn test_worked_example() {
        let d = decomposition();
        let t = trace(&[
            Access::read(1),
            Access::read(2),
            Access::write(1),
            Access::read(3),
            Access::read(1),
        ]);

        let scan = scan_controller("X", &t, &d);

        assert_eq!(
            reasons(&scan),
            vec![
                (0, CostReason::First),
                (1, CostReason::NewEntity),
                (2, CostReason::Escalation),
                (3, CostReason::ClusterTransition),
                (4, CostReason::ClusterTransition),
            ]
        );
        assert_eq!(scan.accesses.costly_mode(1), Some(AccessMode::Read));
        assert_eq!(scan.accesses.costly_mode(2), Some(AccessMode::Read));
        assert_eq!(scan.accesses.costly_mode(3), Some(AccessMode::Read));
        assert_eq!(scan.accesses.len(), 3);
    }

    #[test]
    fn test_empty_trace() {
        let scan = scan_controller("X", &AccessTrace::default(), &decomposition());

        assert!(scan.accesses.is_empty());
        assert!(scan.events.is_empty());
        assert!(scan.local_transactions().is_empty());
        assert_eq!(scan.name(), "X");
    }

    #[test]
    fn test_single_access() {
        let scan = scan_controller("X", &trace(&[Access::write(2)]), &decomposition());

        assert_eq!(reasons(&scan), vec![(0, CostReason::First)]);
        assert_eq!(scan.accesses.costly_mode(2), Some(AccessMode::Write));
    }

    #[test]
    fn test_read_after_read_same_run_is_free() {
        let scan = scan_controller(
            "X",
            &trace(&[Access::read(1), Access::read(1)]),
            &decomposition(),
        );
        assert!(scan.is_costly(0));
        assert!(!scan.is_costly(1));
    }

    #[test]
    fn test_write_after_read_same_run_escalates() {
        let scan = scan_controller(
            "X",
            &trace(&[Access::read(1), Access::read(2), Access::write(1)]),
            &decomposition(),
        );
        assert!(scan.is_costly(2));
        assert_eq!(scan.events[2].reason, CostReason::Escalation);
        assert_eq!(scan.accesses.costly_mode(1), Some(AccessMode::Write));
    }

    #[test]
    fn test_read_after_write_same_run_is_free() {
        let scan = scan_controller(
            "X",
            &trace(&[Access::write(1), Access::read(1), Access::write(1)]),
            &decomposition(),
        );
        assert_eq!(scan.costly_count(), 1);
        // Write is never downgraded inside the run
        assert_eq!(scan.accesses.costly_mode(1), Some(AccessMode::Write));
    }

    #[test]
    fn test_transition_resets_run() {
        // 1 is re-read after visiting cluster 1: the run restarted
        let scan = scan_controller(
            "X",
            &trace(&[Access::write(1), Access::read(3), Access::read(1)]),
            &decomposition(),
        );
        assert_eq!(scan.costly_count(), 3);
        assert_eq!(scan.accesses.costly_mode(1), Some(AccessMode::Read));
        assert_eq!(
            scan.events.iter().map(|e| e.run).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_unknown_entities_share_one_bucket() {
        // 50 and 60 are unassigned: 60 continues the unknown run
        let scan = scan_controller(
            "X",
            &trace(&[
                Access::read(1),
                Access::read(50),
                Access::read(60),
                Access::read(50),
            ]),
            &decomposition(),
        );

        assert_eq!(
            reasons(&scan),
            vec![
                (0, CostReason::First),
                (1, CostReason::ClusterTransition),
                (2, CostReason::NewEntity),
            ]
        );
        assert_eq!(scan.events[1].cluster, ClusterKey::Unknown);
    }

    #[test]
    fn test_unknown_entity_does_not_continue_cluster_zero() {
        let scan = scan_controller(
            "X",
            &trace(&[Access::read(1), Access::read(99), Access::read(2)]),
            &decomposition(),
        );
        assert_eq!(scan.costly_count(), 3);
        assert_eq!(scan.events[2].reason, CostReason::ClusterTransition);
    }

    #[test]
    fn test_local_transactions_group_runs() {
        let scan = scan_controller(
            "X",
            &trace(&[
                Access::read(1),
                Access::read(2),
                Access::read(1),
                Access::write(1),
                Access::read(3),
                Access::write(3),
                Access::read(2),
            ]),
            &decomposition(),
        );

        let transactions = scan.local_transactions();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].cluster, ClusterKey::Known(0));
        assert_eq!(
            transactions[0].accesses,
            vec![Access::read(1), Access::read(2), Access::write(1)]
        );
        assert_eq!(transactions[1].cluster, ClusterKey::Known(1));
        assert_eq!(
            transactions[1].accesses,
            vec![Access::read(3), Access::write(3)]
        );
        assert_eq!(transactions[2].accesses, vec![Access::read(2)]);
    }

    #[test]
    fn test_push_reports_reason() {
        let d = decomposition();
        let mut scanner = CostlyAccessScanner::new("X", &d);

        assert_eq!(scanner.push(Access::read(1)), Some(CostReason::First));
        assert_eq!(scanner.push(Access::read(1)), None);
        assert_eq!(scanner.push(Access::write(1)), Some(CostReason::Escalation));
        assert_eq!(scanner.push(Access::write(1)), None);
        assert_eq!(
            scanner.push(Access::write(3)),
            Some(CostReason::ClusterTransition)
        );

        let scan = scanner.finish();
        assert_eq!(scan.costly_count(), 3);
    }
}
