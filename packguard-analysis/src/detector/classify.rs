//! Path and content classifiers.
//!
//! Small pure functions over externally configurable keyword lists; no
//! classification decision is hard-coded at a call site.

/// Lowercased tokens of a slash-separated path, split on `/ . _ -`.
pub fn path_tokens(path: &str) -> Vec<String> {
    path.to_lowercase()
        .split(['/', '.', '_', '-'])
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// True when the path lies under a directory reserved for intentionally
/// malicious fixtures. Findings there are never suppressed.
pub fn is_fixture_path(path: &str, fixture_dirs: &[String]) -> bool {
    let lowered = path.to_lowercase();
    lowered
        .split('/')
        .any(|component| fixture_dirs.iter().any(|d| component == d.to_lowercase()))
}

/// True when path or content keyword heuristics classify the file as test,
/// example, or demo content.
pub fn is_test_content(path: &str, content: &str, test_markers: &[String]) -> bool {
    let tokens = path_tokens(path);
    if tokens
        .iter()
        .any(|t| test_markers.iter().any(|m| t == &m.to_lowercase()))
    {
        return true;
    }

    // Content probe: two distinct test-harness call shapes.
    let probes = [
        "describe(", "it(", "expect(", "beforeEach(", "@pytest", "def test_",
    ];
    probes.iter().filter(|p| content.contains(*p)).count() >= 2
}

/// True when the path classifies as configuration by suffix or keyword.
pub fn is_config_path(path: &str, config_markers: &[String]) -> bool {
    let filename = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    for marker in config_markers {
        let marker = marker.to_lowercase();
        if let Some(suffix) = marker.strip_prefix('.') {
            if filename.ends_with(&format!(".{suffix}")) {
                return true;
            }
        } else if filename
            .split(['.', '_', '-'])
            .any(|t| t == marker || t.ends_with(&marker))
        {
            return true;
        }
    }
    false
}

/// True when the file is mostly documentation: content at least `min_len`
/// long whose code-line density falls below `threshold`.
pub fn is_mostly_documentation(content: &str, min_len: usize, threshold: f64) -> bool {
    if content.len() < min_len {
        return false;
    }
    let mut total = 0usize;
    let mut code = 0usize;
    let mut in_fence = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        total += 1;
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || looks_like_code(trimmed) {
            code += 1;
        }
    }
    if total == 0 {
        return true;
    }
    (code as f64) / (total as f64) < threshold
}

fn looks_like_code(line: &str) -> bool {
    line.chars()
        .any(|c| matches!(c, ';' | '{' | '}' | '=' | '(' | ')'))
}
