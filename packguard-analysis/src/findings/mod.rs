//! Finding data model — one detection event with evolving scores and flags.

pub mod severity;
pub mod store;

pub use severity::Severity;
pub use store::{FindingId, FindingStore};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Maximum stored length of matched text.
pub const MAX_MATCHED_TEXT: usize = 120;
/// Maximum stored length of the surrounding snippet.
pub const MAX_SNIPPET: usize = 200;

/// A cross-file relationship attached to one or more findings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub kind: CorrelationKind,
    pub severity: Severity,
    /// Human-readable description referencing the implicated files/lines.
    pub details: String,
    /// Implicated files, sorted.
    pub files: Vec<String>,
}

/// The correlation detectors' record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    SuspiciousImport,
    AttackChain,
    DistributedExfiltration,
    DataFlowChain,
    MultiFilePersistence,
    ConfigInjection,
    ConfigTampering,
}

impl CorrelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuspiciousImport => "suspicious_import",
            Self::AttackChain => "attack_chain",
            Self::DistributedExfiltration => "distributed_exfiltration",
            Self::DataFlowChain => "data_flow_chain",
            Self::MultiFilePersistence => "multi_file_persistence",
            Self::ConfigInjection => "config_injection",
            Self::ConfigTampering => "config_tampering",
        }
    }
}

/// One detection event.
///
/// `line` always indexes into the exact content snapshot the detector matched
/// against. Scores and flags are replaced wholesale per pipeline stage;
/// `correlations` is append-only and written only by the correlator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    /// 1-indexed line of the match start.
    pub line: u32,
    pub category: String,
    pub matcher: String,
    /// Truncated matched text.
    pub matched_text: String,
    /// Truncated surrounding snippet (the matched line).
    pub snippet: String,
    /// Multiplicative context score, ≥ 0.
    pub context_score: f32,
    /// Threat score, capped at 2.0.
    pub threat_score: f32,
    /// Semantic score, capped at 2.0. Recomputed by the enhancer.
    pub semantic_score: f32,
    /// Provisional severity from the detector.
    pub severity: Severity,
    /// Severity after semantic enhancement.
    pub adjusted_severity: Severity,
    pub is_test_code: bool,
    pub involves_user_input: bool,
    pub is_exported: bool,
    pub has_external_data_flow: bool,
    #[serde(default)]
    pub correlations: Vec<CorrelationRecord>,
}

impl Finding {
    /// Construct a fresh detection-stage finding. Semantic fields start from
    /// the detector's values and are rewritten by the enhancer.
    pub fn new(
        file: impl Into<String>,
        line: u32,
        category: impl Into<String>,
        matcher: impl Into<String>,
        matched_text: &str,
        snippet: &str,
        context_score: f32,
        threat_score: f32,
        severity: Severity,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            category: category.into(),
            matcher: matcher.into(),
            matched_text: truncate(matched_text, MAX_MATCHED_TEXT),
            snippet: truncate(snippet, MAX_SNIPPET),
            context_score,
            threat_score,
            semantic_score: threat_score,
            severity,
            adjusted_severity: severity,
            is_test_code: false,
            involves_user_input: false,
            is_exported: false,
            has_external_data_flow: false,
            correlations: Vec::new(),
        }
    }

    /// Severity used for reporting and exit status: the enhanced one.
    pub fn effective_severity(&self) -> Severity {
        self.adjusted_severity
    }

    /// Identity hash for de-duplication.
    pub fn identity_hash(&self) -> u64 {
        let key = format!(
            "{}\n{}\n{}\n{}\n{}",
            self.file, self.line, self.category, self.matcher, self.matched_text
        );
        xxh3_64(key.as_bytes())
    }

    /// Canonical ordering key: `(file, line, category, matcher)`.
    pub fn sort_key(&self) -> (&str, u32, &str, &str) {
        (&self.file, self.line, &self.category, &self.matcher)
    }
}

/// Sort findings into canonical order so downstream grouping is independent
/// of scheduling.
pub fn sort_canonical(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Collapse exact duplicates, keeping the first occurrence in canonical
/// order. Identity is `(file, line, category, matcher, matched_text)`.
pub fn dedup_exact(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = rustc_hash::FxHashSet::default();
    findings
        .into_iter()
        .filter(|f| seen.insert(f.identity_hash()))
        .collect()
}

/// Truncate to a character boundary at or below `max` bytes.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: u32, matcher: &str, text: &str) -> Finding {
        Finding::new(
            file,
            line,
            "obfuscation",
            matcher,
            text,
            text,
            1.0,
            0.5,
            Severity::Medium,
        )
    }

    #[test]
    fn dedup_collapses_identical_events() {
        let out = dedup_exact(vec![
            finding("a.js", 3, "eval-call", "eval(x)"),
            finding("a.js", 3, "eval-call", "eval(x)"),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn dedup_keeps_distinct_matchers() {
        let out = dedup_exact(vec![
            finding("a.js", 3, "eval-call", "eval(x)"),
            finding("a.js", 3, "dynamic-eval", "eval(x)"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld".repeat(30);
        let t = truncate(&s, MAX_MATCHED_TEXT);
        assert!(t.len() <= MAX_MATCHED_TEXT);
        assert!(s.starts_with(&t));
    }

    #[test]
    fn canonical_sort_is_by_file_then_line() {
        let mut v = vec![
            finding("b.js", 1, "m", "x"),
            finding("a.js", 9, "m", "x"),
            finding("a.js", 2, "m", "x"),
        ];
        sort_canonical(&mut v);
        assert_eq!(v[0].file, "a.js");
        assert_eq!(v[0].line, 2);
        assert_eq!(v[2].file, "b.js");
    }
}
