//! Result sinks: JSON report and text summary
//!
//! Both sinks consume a finished [`Analysis`]. Controllers without costly
//! accesses are part of every analysis; `skip_empty` only hides them from the
//! rendered output (the digest still covers them).

use crate::complexity::ComplexityReport;
use crate::coordinator::Analysis;
use crate::decomposition::{ClusterId, EntityId};
use crate::mode::AccessMode;
use crate::scanner::{ControllerScan, CostReason, CostlyEvent};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Rendering options shared by both sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub skip_empty: bool,
    pub explain: bool,
}

/// Execution details of the run
#[derive(Debug, Clone, Serialize)]
pub struct JsonExecution {
    pub mode: String,
    pub workers: usize,
}

/// Summary of the run
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Controllers analysed (including ones without costly accesses)
    pub controllers: usize,
    pub controllers_with_cost: usize,
    /// Total costly accesses
    pub costly_accesses: usize,
    pub elapsed_us: u64,
    /// SHA-256 of the controller → entity → mode mapping
    pub digest: String,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub execution: JsonExecution,
    /// Controller → entity → mode under which the entity was last costly
    pub controllers: BTreeMap<String, BTreeMap<EntityId, AccessMode>>,
    /// Costly events per controller (if --explain enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<BTreeMap<String, Vec<CostlyEvent>>>,
    pub summary: JsonSummary,
    /// Decomposition complexity (if --complexity enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityReport>,
}

impl JsonReport {
    /// Build the report for a finished analysis
    pub fn new(analysis: &Analysis, options: ReportOptions) -> Self {
        let shown: Vec<(&String, &ControllerScan)> = visible(analysis, options).collect();

        let controllers = shown
            .iter()
            .map(|(name, scan)| ((*name).clone(), scan.accesses.costly().clone()))
            .collect();

        let events = options.explain.then(|| {
            shown
                .iter()
                .map(|(name, scan)| ((*name).clone(), scan.events.clone()))
                .collect()
        });

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "frontera-json-v1".to_string(),
            execution: JsonExecution {
                mode: analysis.execution.name().to_string(),
                workers: analysis.workers,
            },
            controllers,
            events,
            summary: JsonSummary {
                controllers: analysis.controllers.len(),
                controllers_with_cost: analysis.controllers_with_cost(),
                costly_accesses: analysis.costly_accesses(),
                elapsed_us: analysis.elapsed.as_micros() as u64,
                digest: analysis.digest(),
            },
            complexity: None,
        }
    }

    /// Attach complexity results
    pub fn set_complexity(&mut self, report: ComplexityReport) {
        self.complexity = Some(report);
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn visible(
    analysis: &Analysis,
    options: ReportOptions,
) -> impl Iterator<Item = (&String, &ControllerScan)> {
    analysis
        .controllers
        .iter()
        .filter(move |(_, scan)| !(options.skip_empty && scan.accesses.is_empty()))
}

fn reason_label(reason: CostReason) -> &'static str {
    match reason {
        CostReason::First => "first access",
        CostReason::NewEntity => "new entity",
        CostReason::Escalation => "R→W escalation",
        CostReason::ClusterTransition => "cluster transition",
    }
}

/// Render the text summary
///
/// Controllers are listed by costly accesses (descending), then by name.
pub fn render_text(
    analysis: &Analysis,
    complexity: Option<&ComplexityReport>,
    options: ReportOptions,
) -> String {
    let mut out = String::new();

    if analysis.controllers.is_empty() {
        out.push_str("No controllers analysed.\n");
        return out;
    }

    let mut sorted: Vec<_> = visible(analysis, options).collect();
    sorted.sort_by(|a, b| {
        b.1.costly_count()
            .cmp(&a.1.costly_count())
            .then_with(|| a.0.cmp(b.0))
    });

    let rule = "------- --------- --------- ---------- ----------------";
    let _ = writeln!(out, " costly  entities  clusters complexity controller");
    let _ = writeln!(out, "{}", rule);

    for (name, scan) in &sorted {
        let clusters: BTreeSet<ClusterId> =
            scan.events.iter().filter_map(|e| e.cluster.id()).collect();
        let controller_complexity = complexity
            .and_then(|report| report.get(name))
            .map(|c| c.complexity.to_string())
            .unwrap_or_default();

        let _ = writeln!(
            out,
            "{:>7} {:>9} {:>9} {:>10} {}",
            scan.costly_count(),
            scan.accesses.len(),
            clusters.len(),
            controller_complexity,
            name
        );

        if options.explain {
            for event in &scan.events {
                let _ = writeln!(
                    out,
                    "{:>9} #{} {} {} @ cluster {} ({})",
                    "",
                    event.index,
                    event.access.mode,
                    event.access.entity,
                    event.cluster,
                    reason_label(event.reason)
                );
            }
        }
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "{:>7} {:>9} {:>9} {:>10} total ({} controllers, {} with costly accesses)",
        analysis.costly_accesses(),
        "",
        "",
        "",
        analysis.controllers.len(),
        analysis.controllers_with_cost()
    );
    let _ = writeln!(
        out,
        "elapsed: {:?} ({}, {} worker(s))",
        analysis.elapsed,
        analysis.execution.name(),
        analysis.workers
    );
    let _ = writeln!(out, "digest: {}", analysis.digest());
    if let Some(report) = complexity {
        let _ = writeln!(out, "complexity: {:.3}", report.complexity);
    }

    out
}
