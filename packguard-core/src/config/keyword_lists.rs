//! Classifier keyword lists with compiled defaults.
//!
//! Every list is replaceable from configuration; the defaults below are what
//! a stock scan runs with.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Keyword lists for the path/content classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierLists {
    /// Path/content tokens that mark test, example, or demo content.
    pub test_markers: Vec<String>,
    /// Directory names reserved for intentionally malicious fixtures.
    /// Findings under these are never suppressed, whatever else matches.
    pub fixture_dirs: Vec<String>,
    /// Path tokens/suffixes that classify a file as configuration.
    pub config_markers: Vec<String>,
}

impl Default for ClassifierLists {
    fn default() -> Self {
        Self {
            test_markers: strings(&[
                "test", "tests", "spec", "specs", "example", "examples", "demo",
                "sample", "mock", "__tests__", "fixture",
            ]),
            fixture_dirs: strings(&["malicious-fixtures", "malware-samples", "known-bad"]),
            config_markers: strings(&[
                ".json", ".yaml", ".yml", ".toml", ".ini", ".conf", ".env",
                "config", "settings", "rc",
            ]),
        }
    }
}

/// Vocabularies for the per-file data-flow sketch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLists {
    /// Identifiers that root a user-input member access (request-like objects).
    pub user_input_roots: Vec<String>,
    /// Callee-name fragments that mark a network call.
    pub network_calls: Vec<String>,
    /// Callee-name fragments that mark code execution or process spawning.
    pub sensitive_calls: Vec<String>,
    /// Import sources recognized as test frameworks.
    pub test_frameworks: Vec<String>,
}

impl Default for FlowLists {
    fn default() -> Self {
        Self {
            user_input_roots: strings(&[
                "req", "request", "ctx", "query", "params", "body", "input",
                "event", "argv", "stdin",
            ]),
            network_calls: strings(&[
                "fetch", "axios", "request", "http", "https", "XMLHttpRequest",
                "WebSocket", "urllib", "requests", "socket",
            ]),
            sensitive_calls: strings(&[
                "eval", "exec", "execSync", "spawn", "spawnSync", "Function",
                "child_process", "system", "popen", "subprocess",
            ]),
            test_frameworks: strings(&[
                "jest", "mocha", "chai", "vitest", "ava", "jasmine", "tape",
                "pytest", "unittest",
            ]),
        }
    }
}

/// Vocabularies for the whole-file indicator heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorLists {
    /// Instruction-override phrases (prompt-injection style).
    pub override_phrases: Vec<String>,
    /// Encoding/decoding call names.
    pub encoding_calls: Vec<String>,
    /// Privilege-escalation keywords.
    pub privilege_keywords: Vec<String>,
}

impl Default for IndicatorLists {
    fn default() -> Self {
        Self {
            override_phrases: strings(&[
                "ignore previous instructions",
                "ignore all previous",
                "disregard prior instructions",
                "new instructions:",
                "system prompt",
            ]),
            encoding_calls: strings(&[
                "atob", "btoa", "base64", "fromCharCode", "unescape",
                "decodeURIComponent", "b64decode", "hex2bin",
            ]),
            privilege_keywords: strings(&[
                "sudo", "setuid", "chmod 777", "runas", "administrator",
                "NOPASSWD", "CAP_SYS_ADMIN",
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let c = ClassifierLists::default();
        assert!(c.test_markers.iter().any(|m| m == "test"));
        assert!(c.fixture_dirs.iter().any(|m| m == "malicious-fixtures"));

        let f = FlowLists::default();
        assert!(f.user_input_roots.iter().any(|m| m == "req"));
        assert!(f.sensitive_calls.iter().any(|m| m == "eval"));

        let i = IndicatorLists::default();
        assert!(i.override_phrases.len() >= 3);
    }
}
