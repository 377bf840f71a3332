//! Pattern catalog errors.

/// Errors raised while loading and compiling the external pattern catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog document itself is unusable. Fatal at load.
    #[error("Catalog parse error: {0}")]
    Parse(String),

    /// A single matcher failed to compile. The matcher is dropped and the
    /// rest of the catalog loads; surfaced to the caller as a warning.
    #[error("Matcher '{category}/{matcher}' failed to compile: {message}")]
    PatternCompile {
        category: String,
        matcher: String,
        message: String,
    },

    #[error("Unknown severity '{0}' in catalog")]
    UnknownSeverity(String),
}
