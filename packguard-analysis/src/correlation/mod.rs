//! Cross-file correlation — runs exactly once, after every file has been
//! detected and enhanced.
//!
//! The correlator reads an immutable snapshot of the finding arena plus the
//! dependency graph, runs the chain detectors, canonicalizes their combined
//! output, and attaches each record to every finding of every implicated
//! file. Identical inputs always produce an identical record set.

pub mod detectors;
pub mod graph;

pub use detectors::CorrelationInput;
pub use graph::DependencyGraph;

use tracing::debug;

use packguard_core::ScanConfig;

use crate::findings::{CorrelationRecord, Finding, FindingStore};

/// The correlation stage.
pub struct Correlator<'a> {
    config: &'a ScanConfig,
}

impl<'a> Correlator<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    /// Run every chain detector over a snapshot of the store and attach the
    /// canonicalized records.
    pub fn correlate(&self, store: &mut FindingStore, graph: &DependencyGraph) {
        let snapshot: Vec<Finding> = store.snapshot().to_vec();
        let records = self.detect(&snapshot, graph);
        debug!(records = records.len(), "correlation records computed");

        for record in records {
            for file in &record.files {
                for id in store.ids_for_file(file) {
                    store.attach(id, record.clone());
                }
            }
        }
    }

    /// Pure record computation over immutable inputs, in canonical order.
    pub fn detect(&self, findings: &[Finding], graph: &DependencyGraph) -> Vec<CorrelationRecord> {
        let input = CorrelationInput {
            findings,
            graph,
            config: self.config,
        };

        let mut records = Vec::new();
        records.extend(detectors::suspicious_imports(&input));
        records.extend(detectors::attack_chains(&input));
        records.extend(detectors::distributed_exfiltration(&input));
        records.extend(detectors::data_flow_chains(&input));
        records.extend(detectors::persistence_chains(&input));
        records.extend(detectors::config_injection(&input));

        records.sort();
        records.dedup();
        records
    }
}
