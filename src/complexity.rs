//! Decomposition complexity
//!
//! Turns the costly accesses of every controller into a single score for the
//! decomposition. A controller pays, for every local transaction it runs, one
//! unit per *other* distributed controller that touches the same entities
//! under a conflicting mode: those are the controllers whose consistency it
//! has to coordinate with.
//!
//! - A controller is *distributed* when its costly entities span two or more
//!   clusters; controllers confined to one cluster have complexity 0.
//! - Access `(m, e)` conflicts with controller `C` when `C` is distributed,
//!   was charged for `e`, and its touch summary for `e` is not exactly `m`
//!   (a read/write summary conflicts with both modes).
//! - Controller complexity = Σ over its local transactions of the number of
//!   distinct conflicting controllers of the accesses in the transaction.
//! - Decomposition complexity = Σ controller complexities ÷ number of
//!   controllers touching at least one cluster.

use crate::coordinator::{fan_out, Analysis, Execution};
use crate::decomposition::{ClusterId, Decomposition, EntityId};
use crate::mode::ModeSummary;
use crate::scanner::ControllerScan;
use crate::trace::Access;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// Complexity of one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerComplexity {
    /// Distinct clusters touched by the controller's costly accesses
    pub clusters: usize,
    pub local_transactions: usize,
    pub complexity: u64,
}

/// Complexity of a whole decomposition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityReport {
    /// Controllers touching at least one cluster
    pub controllers: BTreeMap<String, ControllerComplexity>,
    /// Mean controller complexity
    pub complexity: f64,
}

impl ComplexityReport {
    pub fn get(&self, controller: &str) -> Option<&ControllerComplexity> {
        self.controllers.get(controller)
    }
}

/// Entity → distributed controllers charged for it, with their touch summary
type EntityIndex<'a> = HashMap<EntityId, Vec<(&'a str, ModeSummary)>>;

/// Compute the complexity of `decomposition` from a finished analysis
pub fn compute_complexity(
    decomposition: &Decomposition,
    analysis: &Analysis,
    execution: Execution,
) -> ComplexityReport {
    let start = Instant::now();

    let clusters: BTreeMap<&str, BTreeSet<ClusterId>> = analysis
        .controllers
        .iter()
        .map(|(name, scan)| (name.as_str(), touched_clusters(decomposition, scan)))
        .filter(|(_, clusters)| !clusters.is_empty())
        .collect();

    let index = build_entity_index(analysis, &clusters);

    let items: Vec<(&str, &ControllerScan)> = clusters
        .keys()
        .filter_map(|&name| analysis.get(name).map(|scan| (name, scan)))
        .collect();

    let controllers = fan_out(&items, execution, |name, scan| {
        let cluster_count = clusters.get(name).map_or(0, BTreeSet::len);
        let transactions = scan.local_transactions();
        let complexity: u64 = if cluster_count > 1 {
            transactions
                .iter()
                .map(|transaction| transaction_cost(name, &transaction.accesses, &index))
                .sum()
        } else {
            0
        };

        ControllerComplexity {
            clusters: cluster_count,
            local_transactions: transactions.len(),
            complexity,
        }
    });

    let total: u64 = controllers.values().map(|c| c.complexity).sum();
    let complexity = if controllers.is_empty() {
        0.0
    } else {
        total as f64 / controllers.len() as f64
    };

    tracing::info!(
        "Complexity {:.3} over {} controllers took {:?}",
        complexity,
        controllers.len(),
        start.elapsed()
    );

    ComplexityReport {
        controllers,
        complexity,
    }
}

/// Known clusters owning the entities a controller was charged for
fn touched_clusters(decomposition: &Decomposition, scan: &ControllerScan) -> BTreeSet<ClusterId> {
    scan.accesses
        .entities()
        .filter_map(|entity| decomposition.cluster_of(entity))
        .collect()
}

fn build_entity_index<'a>(
    analysis: &'a Analysis,
    clusters: &BTreeMap<&str, BTreeSet<ClusterId>>,
) -> EntityIndex<'a> {
    let mut index: EntityIndex<'a> = HashMap::new();

    for (name, scan) in &analysis.controllers {
        if clusters.get(name.as_str()).map_or(0, BTreeSet::len) < 2 {
            continue;
        }
        for (&entity, &summary) in scan.accesses.touched() {
            index.entry(entity).or_default().push((name.as_str(), summary));
        }
    }

    index
}

/// Distinct controllers conflicting with any access of one local transaction
fn transaction_cost(controller: &str, accesses: &[Access], index: &EntityIndex<'_>) -> u64 {
    let mut conflicting: BTreeSet<&str> = BTreeSet::new();

    for access in accesses {
        let Some(touching) = index.get(&access.entity) else {
            continue;
        };
        for &(other, summary) in touching {
            if other != controller && !summary.is_only(access.mode) {
                conflicting.insert(other);
            }
        }
    }

    conflicting.len() as u64
}
