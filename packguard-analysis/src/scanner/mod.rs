//! File discovery — gitignore-aware walk with include/exclude globs,
//! producing the in-memory content snapshot shared by every pipeline stage.
//!
//! The snapshot is the invariant anchor for finding line numbers: all three
//! stages read the same bytes that were read here, exactly once.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use packguard_core::errors::ScanError;
use packguard_core::ScanConfig;

/// One discovered file: its path relative to the scan root (slash-separated)
/// and the content snapshot used for the whole run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// The candidate file set, sorted by path.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Build a snapshot from in-memory files, for callers that already hold
    /// content (embedding, tests). Paths are sorted.
    pub fn from_files(mut files: Vec<SourceFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files }
    }
}

/// Walks a scan target into a [`FileSet`].
pub struct Scanner {
    config: ScanConfig,
    include: GlobSet,
    exclude: GlobSet,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let include = build_globset(&config.include)?;
        let exclude = build_globset(&config.exclude)?;
        Ok(Self {
            config,
            include,
            exclude,
        })
    }

    /// Discover the candidate file set under `target` (file or directory).
    ///
    /// A missing target is fatal. An unreadable file is skipped silently
    /// (logged at debug) and the scan continues. Files above the size ceiling
    /// are skipped before being read.
    pub fn discover(&self, target: &Path) -> Result<FileSet, ScanError> {
        if !target.exists() {
            return Err(ScanError::TargetNotFound(target.to_path_buf()));
        }

        let mut files = Vec::new();

        if target.is_file() {
            if let Some(file) = self.read_candidate(target, target.parent().unwrap_or(target)) {
                files.push(file);
            }
        } else {
            let walker = WalkBuilder::new(target)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .build();

            for entry in walker.flatten() {
                let path = entry.path();
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                if let Some(file) = self.read_candidate(path, target) {
                    files.push(file);
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(FileSet { files })
    }

    fn read_candidate(&self, path: &Path, root: &Path) -> Option<SourceFile> {
        let rel = relative_key(path, root);

        if !self.include.is_empty() && !self.include.is_match(&rel) {
            return None;
        }
        if self.exclude.is_match(&rel) {
            return None;
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.effective_max_file_size() => {
                debug!(path = %rel, size = meta.len(), "file over size ceiling, skipped");
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(path = %rel, error = %e, "stat failed, file skipped");
                return None;
            }
        }

        match std::fs::read(path) {
            Ok(bytes) => Some(SourceFile {
                path: rel,
                content: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(e) => {
                debug!(path = %rel, error = %e, "read failed, file skipped");
                None
            }
        }
    }
}

/// Slash-separated path relative to the scan root.
fn relative_key(path: &Path, root: &Path) -> String {
    let rel: PathBuf = path
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf());
    let mut key = String::new();
    for component in rel.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidGlob {
        pattern: String::new(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_target_is_fatal() {
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let err = scanner.discover(Path::new("/no/such/tree")).unwrap_err();
        assert!(matches!(err, ScanError::TargetNotFound(_)));
    }

    #[test]
    fn discovers_sorted_relative_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "src/b.js", "b()");
        write(dir.path(), "src/a.js", "a()");
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let set = scanner.discover(dir.path()).unwrap();
        let paths: Vec<_> = set.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.js", "src/b.js"]);
        assert_eq!(set.get("src/a.js").unwrap().content, "a()");
    }

    #[test]
    fn exclude_globs_apply() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "src/a.js", "a()");
        write(dir.path(), "vendor/c.js", "c()");
        let config = ScanConfig {
            exclude: vec!["vendor/**".into()],
            ..Default::default()
        };
        let scanner = Scanner::new(config).unwrap();
        let set = scanner.discover(dir.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("vendor/c.js").is_none());
    }

    #[test]
    fn oversized_file_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "big.js", &"x".repeat(2048));
        write(dir.path(), "small.js", "ok()");
        let config = ScanConfig {
            max_file_size: Some(1024),
            ..Default::default()
        };
        let scanner = Scanner::new(config).unwrap();
        let set = scanner.discover(dir.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("small.js").is_some());
    }

    #[test]
    fn single_file_target() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "one.js", "eval(x)");
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let set = scanner.discover(&dir.path().join("one.js")).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].path, "one.js");
    }
}
