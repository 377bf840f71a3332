//! Semantic enhancement — per-file reclassification of findings against the
//! parsed structural summary.
//!
//! Fail open: a file that cannot be parsed passes its findings through
//! unchanged. On success the file's entire finding set is replaced by the
//! enhanced set, order preserved.

pub mod parser;
pub mod summary;

pub use parser::parse_file;
pub use summary::{FileAnalysis, FunctionDef};

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use packguard_core::errors::ParseError;
use packguard_core::ScanConfig;

use crate::findings::{Finding, Severity};
use crate::scanner::FileSet;

/// Line distance within which a call counts as near a finding.
const CALL_PROXIMITY_LINES: i64 = 3;
/// Semantic score cap.
const SCORE_CAP: f32 = 2.0;

/// The enhancement stage.
pub struct Enhancer<'a> {
    config: &'a ScanConfig,
}

impl<'a> Enhancer<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    /// Enhance every file's findings. Returns the rewritten set (canonical
    /// order preserved) and the parse failures that were failed open.
    pub fn enhance_all(
        &self,
        files: &FileSet,
        findings: Vec<Finding>,
    ) -> (Vec<Finding>, Vec<ParseError>) {
        let mut by_file: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
        for finding in findings {
            by_file.entry(finding.file.clone()).or_default().push(finding);
        }

        let results: Vec<(Vec<Finding>, Option<ParseError>)> = by_file
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(path, file_findings)| self.enhance_file(&path, file_findings, files))
            .collect();

        let mut enhanced = Vec::new();
        let mut failures = Vec::new();
        for (file_findings, failure) in results {
            enhanced.extend(file_findings);
            failures.extend(failure);
        }
        (enhanced, failures)
    }

    fn enhance_file(
        &self,
        path: &str,
        findings: Vec<Finding>,
        files: &FileSet,
    ) -> (Vec<Finding>, Option<ParseError>) {
        let Some(source) = files.get(path) else {
            return (findings, None);
        };
        match parse_file(path, &source.content, &self.config.flow) {
            Ok(analysis) => {
                let enhanced = findings
                    .into_iter()
                    .map(|f| enhance_finding(f, &analysis, &self.config.flow.test_frameworks))
                    .collect();
                (enhanced, None)
            }
            Err(e) => {
                debug!(path, error = %e, "parse failed, findings pass through unenhanced");
                (findings, Some(e))
            }
        }
    }
}

/// Rewrite one finding's semantic fields from the file summary.
fn enhance_finding(
    mut finding: Finding,
    analysis: &FileAnalysis,
    test_frameworks: &[String],
) -> Finding {
    finding.is_test_code = is_test_code(finding.line, analysis, test_frameworks);
    finding.involves_user_input = involves_user_input(finding.line, analysis);
    finding.is_exported = is_exported(finding.line, analysis);
    finding.has_external_data_flow =
        !analysis.flow.external_calls.is_empty() || !analysis.flow.sensitive_ops.is_empty();

    let mut score = finding.threat_score;
    if finding.is_test_code {
        score *= 0.3;
    }
    if finding.involves_user_input {
        score *= 1.5;
    }
    if !finding.is_exported {
        score *= 0.7;
    }
    if finding.has_external_data_flow {
        score *= 1.3;
    }
    finding.semantic_score = score.min(SCORE_CAP);
    finding.adjusted_severity = adjusted_severity(finding.semantic_score, finding.is_test_code);
    finding
}

/// True when the finding's line lies within a test-named function's body, or
/// the file imports a recognized test framework. A test keyword elsewhere in
/// the file is not enough.
fn is_test_code(line: u32, analysis: &FileAnalysis, test_frameworks: &[String]) -> bool {
    let in_test_function = analysis
        .functions
        .iter()
        .any(|f| f.contains_line(line) && is_test_name(&f.name));
    if in_test_function {
        return true;
    }
    analysis.imports.iter().any(|import| {
        let module = import
            .source
            .rsplit('/')
            .next()
            .unwrap_or(&import.source);
        test_frameworks.iter().any(|fw| module == fw)
    })
}

/// Test-naming pattern: test/spec/it/describe/before/after as the name or a
/// word-boundary prefix of it.
fn is_test_name(name: &str) -> bool {
    const PREFIXES: [&str; 6] = ["test", "spec", "it", "describe", "before", "after"];
    let lowered = name.to_lowercase();
    PREFIXES.iter().any(|p| {
        if lowered == *p {
            return true;
        }
        if !lowered.starts_with(p) {
            return false;
        }
        // camelCase, snake_case, or digit boundary after the prefix.
        matches!(name.as_bytes().get(p.len()), Some(b) if *b == b'_' || b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

/// True when a user-input source's dotted path has a component textually
/// present among callee-name or argument tokens of calls within ±3 lines of
/// the finding.
fn involves_user_input(line: u32, analysis: &FileAnalysis) -> bool {
    let near_calls: Vec<_> = analysis
        .calls
        .iter()
        .filter(|c| (c.line as i64 - line as i64).abs() <= CALL_PROXIMITY_LINES)
        .collect();
    if near_calls.is_empty() {
        return false;
    }

    analysis.flow.user_input_sources.iter().any(|source| {
        source.expression.split('.').any(|component| {
            let component = component.trim();
            !component.is_empty()
                && near_calls.iter().any(|call| {
                    call.callee.split('.').any(|t| t == component)
                        || call
                            .args
                            .iter()
                            .any(|arg| tokens(arg).any(|t| t == component))
                })
        })
    })
}

/// True when the finding's line lies in the body of an exported function:
/// exported by name, or an export statement within one line of the
/// definition line.
fn is_exported(line: u32, analysis: &FileAnalysis) -> bool {
    analysis.functions.iter().any(|f| {
        f.contains_line(line)
            && analysis.exports.iter().any(|e| {
                e.name == f.name || (e.line as i64 - f.start_line as i64).abs() <= 1
            })
    })
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
}

/// Severity bands over the semantic score, with the test-code override.
fn adjusted_severity(score: f32, is_test: bool) -> Severity {
    if is_test && score < 0.8 {
        return Severity::Low;
    }
    if score >= 1.5 {
        Severity::Critical
    } else if score >= 1.0 {
        Severity::High
    } else if score >= 0.6 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
