//! packguard-analysis — the three-stage analysis pipeline.
//!
//! Stage 1 (detector) applies the external pattern catalog with contextual
//! severity scoring. Stage 2 (semantics) re-scores each file's findings
//! against a parsed structural summary. Stage 3 (correlation) builds a
//! cross-file dependency graph and surfaces coordinated, multi-file threat
//! chains. Stages are separated by hard barriers; see [`pipeline`].

pub mod catalog;
pub mod correlation;
pub mod detector;
pub mod findings;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod semantics;

pub use catalog::PatternCatalog;
pub use correlation::{Correlator, DependencyGraph};
pub use detector::Detector;
pub use findings::{CorrelationKind, CorrelationRecord, Finding, FindingId, FindingStore, Severity};
pub use pipeline::AnalysisPipeline;
pub use report::{ScanReport, Verdict};
pub use scanner::{FileSet, Scanner, SourceFile};
pub use semantics::Enhancer;
