//! Staged orchestration: discover → detect (all files) → enhance (all
//! files) → correlate (once) → report.
//!
//! The barriers are structural. Each stage consumes the completed output
//! collection of the previous one, so the enhancer never sees a partially
//! detected corpus and the correlator never sees partially enhanced state.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use packguard_core::errors::{PipelineError, PipelineResult};
use packguard_core::ScanConfig;

use crate::catalog::PatternCatalog;
use crate::correlation::{Correlator, DependencyGraph};
use crate::detector::Detector;
use crate::findings::FindingStore;
use crate::report::ScanReport;
use crate::scanner::Scanner;
use crate::semantics::Enhancer;

/// The three-stage analysis pipeline.
pub struct AnalysisPipeline {
    catalog: PatternCatalog,
    config: ScanConfig,
}

impl AnalysisPipeline {
    pub fn new(catalog: PatternCatalog, config: ScanConfig) -> Self {
        Self { catalog, config }
    }

    /// Run a full scan of `target`.
    ///
    /// Fatal errors (missing target, invalid glob configuration) abort
    /// before any output; everything else degrades into warnings on the
    /// returned result.
    pub fn run(&self, target: &Path) -> Result<PipelineResult<ScanReport>, PipelineError> {
        let started = Instant::now();

        let scanner = Scanner::new(self.config.clone())?;
        let files = scanner.discover(target)?;
        info!(files = files.len(), "discovery complete");

        let detector = Detector::new(&self.catalog, &self.config);
        let detected = detector.detect_all(&files);
        info!(findings = detected.len(), "detection complete");

        let enhancer = Enhancer::new(&self.config);
        let (enhanced, parse_failures) = enhancer.enhance_all(&files, detected);
        info!(
            findings = enhanced.len(),
            parse_failures = parse_failures.len(),
            "enhancement complete"
        );

        let graph = DependencyGraph::build(&files);
        let mut store = FindingStore::from_findings(enhanced);
        Correlator::new(&self.config).correlate(&mut store, &graph);
        info!(edges = graph.edge_count(), "correlation complete");

        let report = ScanReport::build(
            store.into_findings(),
            started.elapsed().as_millis() as u64,
            files.len(),
            target.display().to_string(),
        );

        let mut result = PipelineResult::new(report);
        for failure in parse_failures {
            result.add_warning(PipelineError::Parse(failure));
        }
        Ok(result)
    }
}
