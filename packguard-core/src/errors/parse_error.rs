//! Syntax parse errors. All variants fail open: the file's findings pass
//! through enhancement unchanged.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No grammar for {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("Syntax errors in {0}")]
    Syntax(PathBuf),

    #[error("Grammar load failed: {0}")]
    Grammar(String),
}
