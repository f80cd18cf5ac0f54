//! Fan-out coordinator
//!
//! Runs one independent scan per controller, either on the calling thread or
//! on a pool of scoped worker threads, and merges the per-controller results
//! after every worker has joined.
//!
//! # Design
//!
//! ```text
//!   TraceSet ──filter──▶ job queue ──▶ worker 1 ──┐
//!                          (MPMC)   ──▶ worker 2 ──┼──▶ result channel ──▶ BTreeMap
//!                                   ──▶ worker N ──┘        (after join)
//!          &Decomposition shared read-only by every worker
//! ```
//!
//! Workers never touch a shared result map: each finished scan is sent back
//! as a value and the coordinator merges sequentially. The merged map is
//! keyed and ordered by controller name, so the result is identical for any
//! worker count or interleaving, including serial execution.

use crate::decomposition::Decomposition;
use crate::error::{AnalysisError, Result};
use crate::filter::ControllerFilter;
use crate::scanner::{scan_controller, ControllerScan};
use crate::trace::{AccessTrace, TraceSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// How controller scans are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Every scan on the calling thread (reference baseline)
    Serial,
    /// Scans spread over at most `jobs` worker threads
    Parallel(NonZeroUsize),
}

impl Execution {
    /// Parallel execution with one worker per available CPU
    pub fn parallel() -> Self {
        Execution::Parallel(
            std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        )
    }

    /// Number of worker threads used for `tasks` units of work
    pub fn workers(self, tasks: usize) -> usize {
        match self {
            Execution::Serial => 1,
            Execution::Parallel(jobs) => jobs.get().min(tasks).max(1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Execution::Serial => "serial",
            Execution::Parallel(_) => "parallel",
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::parallel()
    }
}

/// What to do with accesses to entities outside the decomposition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownEntityPolicy {
    /// Resolve them to the shared unknown cluster bucket
    #[default]
    Bucket,
    /// Fail the run before any controller is scanned
    Reject,
}

/// Options for one analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub execution: Execution,
    pub filter: ControllerFilter,
    pub unknown_entities: UnknownEntityPolicy,
}

/// Result of an analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Scan of every analysed controller, including ones without costly accesses
    pub controllers: BTreeMap<String, ControllerScan>,
    pub execution: Execution,
    /// Worker threads actually used
    pub workers: usize,
    pub elapsed: Duration,
}

impl Analysis {
    pub fn get(&self, controller: &str) -> Option<&ControllerScan> {
        self.controllers.get(controller)
    }

    /// Number of controllers with at least one costly access
    pub fn controllers_with_cost(&self) -> usize {
        self.controllers
            .values()
            .filter(|scan| !scan.accesses.is_empty())
            .count()
    }

    /// Total costly accesses over all controllers
    pub fn costly_accesses(&self) -> usize {
        self.controllers.values().map(ControllerScan::costly_count).sum()
    }

    /// SHA-256 over the controller → entity → costly mode mapping
    ///
    /// Two runs over the same inputs produce the same digest regardless of
    /// execution strategy.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, scan) in &self.controllers {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            for (entity, mode) in scan.accesses.costly() {
                hasher.update(entity.to_le_bytes());
                hasher.update(mode.as_str().as_bytes());
            }
            hasher.update([0xffu8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Run `task` once per named item and collect the results by name
///
/// With more than one worker, items are pulled from a shared job queue by
/// scoped threads and results come back over a channel; the function only
/// returns after every worker joined. A panicking task is re-raised on the
/// calling thread.
///
/// Item names must be unique: results are keyed by name.
pub fn fan_out<T, R, F>(items: &[(&str, &T)], execution: Execution, task: F) -> BTreeMap<String, R>
where
    T: Sync + ?Sized,
    R: Send,
    F: Fn(&str, &T) -> R + Sync,
{
    let workers = execution.workers(items.len());
    if workers <= 1 {
        let results: BTreeMap<String, R> = items
            .iter()
            .map(|&(name, item)| (name.to_string(), task(name, item)))
            .collect();
        debug_assert_eq!(results.len(), items.len(), "duplicate item names");
        return results;
    }

    let (job_tx, job_rx) = crossbeam::channel::unbounded::<(&str, &T)>();
    for &job in items {
        // The receiver is alive until the end of this function
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let (result_tx, result_rx) = crossbeam::channel::unbounded();
    let task = &task;

    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move |_| {
                    for (name, item) in jobs.iter() {
                        let _ = results.send((name.to_string(), task(name, item)));
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });
    drop(result_tx);

    match joined {
        Ok(outcomes) => {
            for outcome in outcomes {
                if let Err(payload) = outcome {
                    std::panic::resume_unwind(payload);
                }
            }
        }
        Err(payload) => std::panic::resume_unwind(payload),
    }

    let results: BTreeMap<String, R> = result_rx.into_iter().collect();
    debug_assert_eq!(results.len(), items.len(), "duplicate item names");
    results
}

/// Analyse every selected controller of `traces` under `decomposition`
///
/// # Errors
/// Returns [`AnalysisError::UnknownEntity`] when the policy is
/// [`UnknownEntityPolicy::Reject`] and a trace references an entity outside
/// the decomposition. The scans themselves cannot fail.
pub fn analyze(
    decomposition: &Decomposition,
    traces: &TraceSet,
    options: &AnalysisOptions,
) -> Result<Analysis> {
    let start = Instant::now();

    let selected: Vec<(&str, &AccessTrace)> = traces
        .iter()
        .filter(|(name, _)| options.filter.should_analyze(name))
        .collect();
    tracing::debug!(
        "{} of {} controllers selected for analysis",
        selected.len(),
        traces.len()
    );

    check_unknown_entities(decomposition, &selected, options.unknown_entities)?;

    let workers = options.execution.workers(selected.len());
    tracing::info!(
        "Scanning {} controllers ({} execution, {} worker(s))",
        selected.len(),
        options.execution.name(),
        workers
    );

    let controllers = fan_out(&selected, options.execution, |name, trace| {
        scan_controller(name, trace, decomposition)
    });

    let elapsed = start.elapsed();
    tracing::info!("Controllers with costly accesses took {:?}", elapsed);

    Ok(Analysis {
        controllers,
        execution: options.execution,
        workers,
        elapsed,
    })
}

/// Run the analysis serially and in parallel and require identical results
///
/// The parallel run uses at least two workers whatever `options.execution`
/// asks for, so it never falls back to the calling thread while there is
/// more than one controller. Returns the analysis matching the requested
/// execution mode.
pub fn verify_determinism(
    decomposition: &Decomposition,
    traces: &TraceSet,
    options: &AnalysisOptions,
) -> Result<Analysis> {
    let requested = match options.execution {
        Execution::Parallel(jobs) => jobs,
        Execution::Serial => {
            std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
        }
    };

    let serial_options = AnalysisOptions {
        execution: Execution::Serial,
        ..options.clone()
    };
    let parallel_options = AnalysisOptions {
        execution: Execution::Parallel(requested.max(NonZeroUsize::MIN.saturating_add(1))),
        ..options.clone()
    };

    let serial = analyze(decomposition, traces, &serial_options)?;
    let parallel = analyze(decomposition, traces, &parallel_options)?;

    let (serial_digest, parallel_digest) = (serial.digest(), parallel.digest());
    if serial_digest != parallel_digest {
        return Err(AnalysisError::NonDeterministic {
            serial: serial_digest,
            parallel: parallel_digest,
        });
    }

    tracing::info!(
        "Serial and parallel ({} worker(s)) results match ({})",
        parallel.workers,
        parallel_digest
    );
    Ok(match options.execution {
        Execution::Serial => serial,
        Execution::Parallel(_) => parallel,
    })
}

fn check_unknown_entities(
    decomposition: &Decomposition,
    selected: &[(&str, &AccessTrace)],
    policy: UnknownEntityPolicy,
) -> Result<()> {
    let mut unknown = 0usize;

    for &(name, trace) in selected {
        for (index, access) in trace.iter().enumerate() {
            if decomposition.cluster_of(access.entity).is_some() {
                continue;
            }
            if policy == UnknownEntityPolicy::Reject {
                return Err(AnalysisError::UnknownEntity {
                    controller: name.to_string(),
                    index,
                    entity: access.entity,
                });
            }
            unknown += 1;
        }
    }

    if unknown > 0 {
        tracing::warn!(
            "{} accesses reference entities outside the decomposition; using the unknown cluster",
            unknown
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::AccessMode;
    use crate::trace::Access;

    fn decomposition() -> Decomposition {
        Decomposition::from_clusters([(0, vec![1, 2]), (1, vec![3]), (2, vec![4, 5])])
    }

    fn traces() -> TraceSet {
        let mut set = TraceSet::new();
        set.insert(
            "X",
            [
                Access::read(1),
                Access::read(2),
                Access::write(1),
                Access::read(3),
                Access::read(1),
            ]
            .into_iter()
            .collect(),
        );
        set.insert("Empty", AccessTrace::default());
        set.insert(
            "Y",
            [Access::write(4), Access::read(5), Access::read(4)]
                .into_iter()
                .collect(),
        );
        for i in 0..20 {
            set.insert(
                format!("Gen{:02}", i),
                (0..30)
                    .map(|j| Access::new(
                        if (i + j) % 3 == 0 { AccessMode::Write } else { AccessMode::Read },
                        ((i * 7 + j) % 6) as i64,
                    ))
                    .collect(),
            );
        }
        set
    }

    fn parallel(jobs: usize) -> Execution {
        Execution::Parallel(NonZeroUsize::new(jobs).unwrap())
    }

    #[test]
    fn test_workers() {
        assert_eq!(Execution::Serial.workers(100), 1);
        assert_eq!(parallel(4).workers(100), 4);
        assert_eq!(parallel(4).workers(2), 2);
        assert_eq!(parallel(4).workers(0), 1);
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let d = decomposition();
        let t = traces();

        let serial = analyze(
            &d,
            &t,
            &AnalysisOptions {
                execution: Execution::Serial,
                ..Default::default()
            },
        )
        .unwrap();

        for jobs in [1, 2, 3, 8, 64] {
            let par = analyze(
                &d,
                &t,
                &AnalysisOptions {
                    execution: parallel(jobs),
                    ..Default::default()
                },
            )
            .unwrap();
            assert_eq!(par.controllers, serial.controllers, "jobs = {}", jobs);
            assert_eq!(par.digest(), serial.digest());
        }
    }

    #[test]
    fn test_empty_results_are_kept() {
        let analysis = analyze(&decomposition(), &traces(), &AnalysisOptions::default()).unwrap();

        let empty = analysis.get("Empty").unwrap();
        assert!(empty.accesses.is_empty());
        assert_eq!(analysis.controllers.len(), 23);
        assert_eq!(analysis.controllers_with_cost(), 22);
    }

    #[test]
    fn test_worked_example_through_coordinator() {
        let analysis = analyze(&decomposition(), &traces(), &AnalysisOptions::default()).unwrap();

        let x = analysis.get("X").unwrap();
        assert_eq!(x.costly_count(), 5);
        assert_eq!(x.accesses.costly_mode(1), Some(AccessMode::Read));

        let y = analysis.get("Y").unwrap();
        // W4 first, R5 new entity, R4 after W4 is free
        assert_eq!(y.costly_count(), 2);
        assert_eq!(y.accesses.costly_mode(4), Some(AccessMode::Write));
    }

    #[test]
    fn test_filter_limits_controllers() {
        let options = AnalysisOptions {
            filter: ControllerFilter::from_expr("controllers=X,/^Gen0/").unwrap(),
            ..Default::default()
        };
        let analysis = analyze(&decomposition(), &traces(), &options).unwrap();

        assert_eq!(analysis.controllers.len(), 11);
        assert!(analysis.get("X").is_some());
        assert!(analysis.get("Y").is_none());
    }

    #[test]
    fn test_reject_unknown_entities() {
        let mut t = TraceSet::new();
        t.insert(
            "Z",
            [Access::read(1), Access::read(99)].into_iter().collect(),
        );
        let options = AnalysisOptions {
            unknown_entities: UnknownEntityPolicy::Reject,
            ..Default::default()
        };

        let err = analyze(&decomposition(), &t, &options).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnknownEntity {
                controller: "Z".to_string(),
                index: 1,
                entity: 99,
            }
        );
    }

    #[test]
    fn test_bucket_unknown_entities() {
        let mut t = TraceSet::new();
        t.insert(
            "Z",
            [Access::read(1), Access::read(99)].into_iter().collect(),
        );

        let analysis = analyze(&decomposition(), &t, &AnalysisOptions::default()).unwrap();
        assert_eq!(analysis.get("Z").unwrap().costly_count(), 2);
    }

    #[test]
    fn test_empty_trace_set() {
        let analysis = analyze(&decomposition(), &TraceSet::new(), &AnalysisOptions::default())
            .unwrap();
        assert!(analysis.controllers.is_empty());
        assert_eq!(analysis.costly_accesses(), 0);
        assert_eq!(analysis.workers, 1);
    }

    #[test]
    fn test_digest_changes_with_result() {
        let d = decomposition();
        let a = analyze(&d, &traces(), &AnalysisOptions::default()).unwrap();

        let mut other = traces();
        other.insert("X", [Access::write(1)].into_iter().collect());
        let b = analyze(&d, &other, &AnalysisOptions::default()).unwrap();

        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_verify_determinism() {
        let analysis =
            verify_determinism(&decomposition(), &traces(), &AnalysisOptions::default()).unwrap();
        assert_eq!(analysis.execution.name(), "parallel");
    }

    #[test]
    fn test_verify_determinism_single_job_still_runs_parallel() {
        let mut t = TraceSet::new();
        for i in 0..8 {
            t.insert(
                format!("C{}", i),
                [Access::read(i % 6), Access::write(3)].into_iter().collect(),
            );
        }
        let options = AnalysisOptions {
            execution: parallel(1),
            ..Default::default()
        };

        let analysis = verify_determinism(&decomposition(), &t, &options).unwrap();
        assert_eq!(analysis.workers, 2);
        assert_eq!(analysis.execution.name(), "parallel");
    }

    #[test]
    fn test_verify_determinism_serial_returns_serial() {
        let options = AnalysisOptions {
            execution: Execution::Serial,
            ..Default::default()
        };

        let analysis = verify_determinism(&decomposition(), &traces(), &options).unwrap();
        assert_eq!(analysis.execution, Execution::Serial);
        assert_eq!(analysis.workers, 1);
    }

    #[test]
    fn test_fan_out_generic() {
        let values = [1u64, 2, 3, 4, 5];
        let items: Vec<(&str, &u64)> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .zip(values.iter())
            .collect();

        let squares = fan_out(&items, parallel(3), |_, v| v * v);
        assert_eq!(squares.get("c"), Some(&9));
        assert_eq!(squares.len(), 5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "duplicate item names")]
    fn test_fan_out_rejects_duplicate_names() {
        let values = [1u64, 2, 3];
        let items: Vec<(&str, &u64)> = ["a", "b", "a"].into_iter().zip(values.iter()).collect();

        fan_out(&items, parallel(2), |_, v| *v);
    }

    #[test]
    #[should_panic(expected = "task failed")]
    fn test_fan_out_propagates_panic() {
        let values = [1u64, 2];
        let items: Vec<(&str, &u64)> = ["a", "b"].into_iter().zip(values.iter()).collect();

        fan_out(&items, parallel(2), |_, v| {
            if *v == 2 {
                panic!("task failed");
            }
            *v
        });
    }
}
