//! Pattern-based detection with contextual severity scoring.
//!
//! For every candidate file the detector applies each catalog matcher at the
//! matcher's own match positions, suppresses matches in safe context or in
//! test/example content (fixture directories excepted), scores what remains,
//! and additionally runs whole-file indicator heuristics.

pub mod classify;
pub mod indicators;
pub mod safe_context;

pub use indicators::IndicatorScanner;
pub use safe_context::SafeContextIndex;

use rayon::prelude::*;

use packguard_core::ScanConfig;

use crate::catalog::PatternCatalog;
use crate::findings::{dedup_exact, sort_canonical, Finding, Severity};
use crate::scanner::{FileSet, SourceFile};

/// Base weight every threat score starts from.
const BASE_WEIGHT: f32 = 0.5;
/// Multiplier applied when a catalog benign phrase appears in the file.
const BENIGN_DAMPENER: f32 = 0.5;
/// Threat score cap.
pub const SCORE_CAP: f32 = 2.0;

/// Maps byte offsets to 1-indexed lines over one content snapshot.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn build(content: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    /// 1 + the number of newlines preceding `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|&s| s <= offset) as u32
    }

    /// The text of a 1-indexed line, without its trailing newline.
    pub fn line_text<'a>(&self, content: &'a str, line: u32) -> &'a str {
        let idx = (line as usize).saturating_sub(1);
        let start = match self.starts.get(idx) {
            Some(&s) => s,
            None => return "",
        };
        let end = self
            .starts
            .get(idx + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(content.len());
        &content[start..end.max(start)]
    }
}

/// The detection stage.
pub struct Detector<'a> {
    catalog: &'a PatternCatalog,
    config: &'a ScanConfig,
    indicators: IndicatorScanner,
}

impl<'a> Detector<'a> {
    pub fn new(catalog: &'a PatternCatalog, config: &'a ScanConfig) -> Self {
        Self {
            catalog,
            config,
            indicators: IndicatorScanner::new(&config.indicators),
        }
    }

    /// Detect across the whole file set in parallel, then merge
    /// deterministically: canonical `(file, line, category, matcher)` order,
    /// followed by exact-duplicate collapse when enabled.
    pub fn detect_all(&self, files: &FileSet) -> Vec<Finding> {
        let mut findings: Vec<Finding> = files
            .files()
            .par_iter()
            .flat_map_iter(|file| self.detect_file(file))
            .collect();
        sort_canonical(&mut findings);
        if self.config.effective_dedup() {
            findings = dedup_exact(findings);
        }
        findings
    }

    /// Detect within one file.
    pub fn detect_file(&self, file: &SourceFile) -> Vec<Finding> {
        if classify::is_mostly_documentation(
            &file.content,
            self.config.effective_doc_density_min_len(),
            self.config.effective_doc_density_threshold(),
        ) {
            return Vec::new();
        }

        // Fixture directories are never suppressed, whatever else matches.
        let suppressed = !classify::is_fixture_path(&file.path, &self.config.classifiers.fixture_dirs)
            && classify::is_test_content(
                &file.path,
                &file.content,
                &self.config.classifiers.test_markers,
            );
        if suppressed {
            return Vec::new();
        }

        let safe = SafeContextIndex::build(&file.content);
        let lines = LineIndex::build(&file.content);
        let context_score = self.context_score(file);

        let mut findings = Vec::new();
        for category in &self.catalog.categories {
            let weight = self.catalog.threat_weight(&category.name);
            for matcher in &category.matchers {
                // The matcher's own positions: re-searching the matched
                // substring would mislocate repeated text.
                for m in matcher.regex.find_iter(&file.content) {
                    if safe.is_safe(m.start()) {
                        continue;
                    }
                    let threat_score = (BASE_WEIGHT * weight * context_score).min(SCORE_CAP);
                    let line = lines.line_of(m.start());
                    findings.push(Finding::new(
                        &file.path,
                        line,
                        &category.name,
                        &matcher.name,
                        m.as_str(),
                        lines.line_text(&file.content, line),
                        context_score,
                        threat_score,
                        provisional_severity(threat_score, category.severity),
                    ));
                }
            }
        }

        findings.extend(self.indicators.scan(&file.path, &file.content));
        findings
    }

    /// Multiplicative context score: 1.0, times each configured
    /// filename/directory modifier whose keyword appears in the path, times
    /// the benign dampener when a catalog benign phrase appears anywhere in
    /// the file.
    fn context_score(&self, file: &SourceFile) -> f32 {
        let tokens = classify::path_tokens(&file.path);
        let mut score = 1.0f32;
        for (keyword, modifier) in self.catalog.context_modifiers() {
            if tokens.iter().any(|t| t.contains(keyword.as_str())) {
                score *= modifier;
            }
        }
        if self.catalog.has_benign_phrase(&file.content) {
            score *= BENIGN_DAMPENER;
        }
        score
    }
}

/// Threshold mapping from threat score to provisional severity, falling back
/// to the category's declared base severity below the lowest band.
fn provisional_severity(threat_score: f32, base: Severity) -> Severity {
    if threat_score >= 1.8 {
        Severity::Critical
    } else if threat_score >= 1.3 {
        Severity::High
    } else if threat_score >= 0.8 {
        Severity::Medium
    } else {
        base
    }
}
