//! Pipeline errors and non-fatal error collection.

use super::{CatalogError, ParseError, ScanError};

/// Errors that can occur during pipeline execution.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result of a pipeline run that accumulates non-fatal errors.
/// Allows partial results to be returned even when some files or matchers
/// degrade along the way.
#[derive(Debug, Default)]
pub struct PipelineResult<T = ()> {
    /// The successful result data.
    pub data: T,
    /// Non-fatal errors collected during the run.
    pub warnings: Vec<PipelineError>,
}

impl<T> PipelineResult<T> {
    /// Create a new result with no warnings.
    pub fn new(data: T) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    /// Record a non-fatal error.
    pub fn add_warning(&mut self, warning: PipelineError) {
        self.warnings.push(warning);
    }

    /// Returns true if no degradation occurred.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of non-fatal errors collected.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_warnings() {
        let mut result: PipelineResult<u32> = PipelineResult::new(7);
        assert!(result.is_clean());

        result.add_warning(PipelineError::Catalog(CatalogError::PatternCompile {
            category: "obfuscation".into(),
            matcher: "bad".into(),
            message: "unclosed group".into(),
        }));

        assert!(!result.is_clean());
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.data, 7);
    }
}
