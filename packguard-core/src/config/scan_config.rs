//! Scan configuration.

use serde::{Deserialize, Serialize};

use super::keyword_lists::{ClassifierLists, FlowLists, IndicatorLists};

/// Configuration for a scan run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Per-file size ceiling in bytes. Files above it are skipped. Default: 1 MiB.
    pub max_file_size: Option<u64>,
    /// A file is "mostly documentation" (and skipped) when its code-line
    /// density is below this ratio. Default: 0.15.
    pub doc_density_threshold: Option<f64>,
    /// Minimum content length before the documentation check applies. Default: 1024.
    pub doc_density_min_len: Option<usize>,
    /// Include globs. Empty means everything.
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Collapse identical (file, line, category, matcher, text) findings. Default: true.
    pub dedup: Option<bool>,
    /// Path/content classifier keyword lists.
    #[serde(default)]
    pub classifiers: ClassifierLists,
    /// Data-flow sketch vocabularies.
    #[serde(default)]
    pub flow: FlowLists,
    /// Whole-file indicator vocabularies.
    #[serde(default)]
    pub indicators: IndicatorLists,
}

impl ScanConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Effective size ceiling, defaulting to 1 MiB.
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(1_048_576)
    }

    /// Effective documentation density threshold, defaulting to 0.15.
    pub fn effective_doc_density_threshold(&self) -> f64 {
        self.doc_density_threshold.unwrap_or(0.15)
    }

    /// Effective minimum length for the documentation check, defaulting to 1024.
    pub fn effective_doc_density_min_len(&self) -> usize {
        self.doc_density_min_len.unwrap_or(1024)
    }

    /// Effective de-duplication toggle, defaulting to true.
    pub fn effective_dedup(&self) -> bool {
        self.dedup.unwrap_or(true)
    }
}
