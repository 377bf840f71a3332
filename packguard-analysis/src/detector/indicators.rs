//! Whole-file indicator heuristics, independent of per-match scanning.
//!
//! Each trips into a synthetic finding at line 1 with a fixed score and a
//! distinct category. Counting is a single Aho-Corasick pass per vocabulary.

use aho_corasick::AhoCorasick;
use rustc_hash::FxHashSet;

use packguard_core::config::IndicatorLists;

use crate::findings::{Finding, Severity};

/// Occurrences of instruction-override phrases above this count trip.
const OVERRIDE_THRESHOLD: usize = 2;
/// Occurrences of encoding/decoding calls above this count trip.
const ENCODING_THRESHOLD: usize = 3;
/// Distinct privilege-escalation keywords at or above this count trip.
const PRIVILEGE_THRESHOLD: usize = 2;

/// Compiled indicator vocabularies.
pub struct IndicatorScanner {
    overrides: Option<AhoCorasick>,
    encodings: Option<AhoCorasick>,
    privileges: Option<AhoCorasick>,
}

impl IndicatorScanner {
    pub fn new(lists: &IndicatorLists) -> Self {
        Self {
            overrides: build(&lists.override_phrases),
            encodings: build(&lists.encoding_calls),
            privileges: build(&lists.privilege_keywords),
        }
    }

    /// Run every indicator against the file content.
    pub fn scan(&self, file: &str, content: &str) -> Vec<Finding> {
        let mut findings = Vec::new();

        if let Some(ac) = &self.overrides {
            let count = ac.find_iter(content).count();
            if count > OVERRIDE_THRESHOLD {
                findings.push(synthetic(
                    file,
                    "instruction_override_flood",
                    format!("{count} instruction-override phrases"),
                    1.8,
                    Severity::Critical,
                ));
            }
        }

        if let Some(ac) = &self.encodings {
            let count = ac.find_iter(content).count();
            if count > ENCODING_THRESHOLD {
                findings.push(synthetic(
                    file,
                    "excessive_encoding",
                    format!("{count} encoding/decoding calls"),
                    1.3,
                    Severity::High,
                ));
            }
        }

        if let Some(ac) = &self.privileges {
            let distinct: FxHashSet<_> = ac.find_iter(content).map(|m| m.pattern()).collect();
            if distinct.len() >= PRIVILEGE_THRESHOLD {
                findings.push(synthetic(
                    file,
                    "privilege_escalation_combo",
                    format!("{} distinct privilege-escalation keywords", distinct.len()),
                    1.8,
                    Severity::Critical,
                ));
            }
        }

        findings
    }
}

fn build(patterns: &[String]) -> Option<AhoCorasick> {
    if patterns.is_empty() {
        return None;
    }
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .ok()
}

fn synthetic(
    file: &str,
    category: &str,
    evidence: String,
    score: f32,
    severity: Severity,
) -> Finding {
    Finding::new(
        file, 1, category, "whole-file", &evidence, &evidence, 1.0, score, severity,
    )
}
