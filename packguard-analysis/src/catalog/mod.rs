//! External pattern catalog — categories of named matchers plus weighting
//! tables, loaded once at process start and immutable for the run.
//!
//! Document shape:
//!
//! ```toml
//! benign_phrases = ["official sdk", "well-known library"]
//!
//! [categories.obfuscation]
//! severity = "high"
//!
//! [categories.obfuscation.patterns.eval-atob]
//! pattern = 'eval\s*\(\s*atob'
//!
//! [threat_weights]
//! obfuscation = 1.2
//!
//! [context_modifiers]
//! system = 1.5
//! config = 1.3
//! ```
//!
//! Matching expressions are adversarial input: they are compiled on the
//! `regex` engine (worst-case linear, no backtracking) with an explicit size
//! limit, and a matcher that fails to compile is dropped with a warning while
//! the rest of the catalog loads.

use std::collections::BTreeMap;

use aho_corasick::AhoCorasick;
use serde::Deserialize;
use tracing::warn;

use packguard_core::errors::CatalogError;

use crate::findings::Severity;

/// Compiled-size ceiling per matcher.
const MATCHER_SIZE_LIMIT: usize = 1 << 20;

/// Serialized catalog document.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDoc {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDef>,
    #[serde(default)]
    pub threat_weights: BTreeMap<String, f32>,
    #[serde(default)]
    pub context_modifiers: BTreeMap<String, f32>,
    #[serde(default)]
    pub benign_phrases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDef {
    pub severity: String,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternDef {
    pub pattern: String,
}

/// A compiled matcher within a category.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    pub name: String,
    pub regex: regex::Regex,
}

/// A named category of matchers with a declared base severity.
#[derive(Debug, Clone)]
pub struct PatternCategory {
    pub name: String,
    pub severity: Severity,
    pub matchers: Vec<CompiledMatcher>,
}

/// The compiled, immutable catalog.
pub struct PatternCatalog {
    /// Categories in name order.
    pub categories: Vec<PatternCategory>,
    threat_weights: BTreeMap<String, f32>,
    /// `(keyword, modifier)` pairs in keyword order.
    context_modifiers: Vec<(String, f32)>,
    benign_phrases: Option<AhoCorasick>,
}

impl PatternCatalog {
    /// Load and compile a catalog document. Per-matcher compile failures are
    /// returned as warnings; a malformed document is fatal.
    pub fn load_from_str(s: &str) -> Result<(Self, Vec<CatalogError>), CatalogError> {
        let doc: CatalogDoc =
            toml::from_str(s).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self::compile(doc))
    }

    /// Load a catalog from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<(Self, Vec<CatalogError>), CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Parse(format!("failed to read {}: {e}", path.display())))?;
        Self::load_from_str(&content)
    }

    /// Compile a parsed document, dropping matchers that fail to compile.
    pub fn compile(doc: CatalogDoc) -> (Self, Vec<CatalogError>) {
        let mut warnings = Vec::new();
        let mut categories = Vec::new();

        for (name, def) in doc.categories {
            let Some(severity) = Severity::parse_str(&def.severity) else {
                warn!(category = %name, severity = %def.severity, "unknown severity, category dropped");
                warnings.push(CatalogError::UnknownSeverity(def.severity));
                continue;
            };

            let mut matchers = Vec::new();
            for (matcher_name, pattern) in def.patterns {
                match regex::RegexBuilder::new(&pattern.pattern)
                    .size_limit(MATCHER_SIZE_LIMIT)
                    .build()
                {
                    Ok(regex) => matchers.push(CompiledMatcher {
                        name: matcher_name,
                        regex,
                    }),
                    Err(e) => {
                        warn!(category = %name, matcher = %matcher_name, error = %e, "matcher dropped");
                        warnings.push(CatalogError::PatternCompile {
                            category: name.clone(),
                            matcher: matcher_name,
                            message: e.to_string(),
                        });
                    }
                }
            }

            categories.push(PatternCategory {
                name,
                severity,
                matchers,
            });
        }

        let benign_phrases = if doc.benign_phrases.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(&doc.benign_phrases)
                .ok()
        };

        let catalog = Self {
            categories,
            threat_weights: doc.threat_weights,
            context_modifiers: doc.context_modifiers.into_iter().collect(),
            benign_phrases,
        };
        (catalog, warnings)
    }

    /// Per-category threat weight, defaulting to 1.0.
    pub fn threat_weight(&self, category: &str) -> f32 {
        self.threat_weights.get(category).copied().unwrap_or(1.0)
    }

    /// `(keyword, modifier)` pairs applied against path tokens.
    pub fn context_modifiers(&self) -> &[(String, f32)] {
        &self.context_modifiers
    }

    /// True when any catalog-listed benign phrase appears in the content.
    pub fn has_benign_phrase(&self, content: &str) -> bool {
        self.benign_phrases
            .as_ref()
            .is_some_and(|ac| ac.is_match(content))
    }

    /// Total matcher count across categories.
    pub fn matcher_count(&self) -> usize {
        self.categories.iter().map(|c| c.matchers.len()).sum()
    }
}
