//! Chain detectors.
//!
//! Each detector is a pure function over the immutable snapshot (plus the
//! dependency graph) and returns the correlation records it found. They share
//! no state, so they can run in any order; the orchestrator canonicalizes
//! the combined output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use packguard_core::ScanConfig;

use crate::detector::classify;
use crate::findings::{CorrelationKind, CorrelationRecord, Finding, Severity};

use super::graph::DependencyGraph;

/// Immutable inputs shared by every detector.
pub struct CorrelationInput<'a> {
    pub findings: &'a [Finding],
    pub graph: &'a DependencyGraph,
    pub config: &'a ScanConfig,
}

static HEX_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9a-fA-F]{16,}").unwrap());
static URL_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://([A-Za-z0-9._-]+)").unwrap());
static CONFIG_PATH_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w./\\-]+\.(?:json|ya?ml|toml|ini|conf|env)\b").unwrap());

const REMOTE_SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];
const TEMP_MARKERS: [&str; 4] = ["/tmp", "/var/tmp", "\\temp", "%temp%"];
const DATAISH_IDENTS: [&str; 7] = ["user", "data", "input", "payload", "url", "remote", "src"];

const EXFIL_CATEGORY_TERMS: [&str; 6] =
    ["exfil", "credential", "steal", "token", "secret", "harvest"];
const NETWORK_EVIDENCE: [&str; 8] = [
    "http://", "https://", "fetch(", "xmlhttprequest", "axios", "curl ", "websocket", ".send(",
];
const ENV_DUMP_EVIDENCE: [&str; 3] = ["process.env", "os.environ", "printenv"];
const USER_INPUT_EVIDENCE: [&str; 4] = ["req.", "request.", "params", ".body"];

const PERSIST_TERMS: [&str; 13] = [
    "backdoor", "persist", "startup", "boot", "install", "cron", "registry", "service", "daemon",
    "launchd", "systemd", "rc.local", "autorun",
];

fn evidence_of(finding: &Finding) -> String {
    format!("{} {}", finding.matched_text, finding.snippet).to_lowercase()
}

/// Imports whose source looks hostile: remote URLs, temp paths, high-entropy
/// or unicode-escaped names, dynamic imports parameterized by a
/// user/data-looking identifier.
pub fn suspicious_imports(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let mut records = Vec::new();
    for (file, imports) in input.graph.imports() {
        for import in imports {
            let source = import.source.to_lowercase();
            let reason = if REMOTE_SCHEMES.iter().any(|s| source.starts_with(s)) {
                Some("remote url source")
            } else if TEMP_MARKERS.iter().any(|m| source.contains(m)) {
                Some("temp directory source")
            } else if HEX_NAME.is_match(&import.source) || import.source.contains("\\u") {
                Some("high-entropy or escaped name")
            } else if import.dynamic_ident.as_deref().is_some_and(|ident| {
                let ident = ident.to_lowercase();
                DATAISH_IDENTS.iter().any(|d| ident.contains(d))
            }) {
                Some("dynamic import of computed source")
            } else {
                None
            };

            if let Some(reason) = reason {
                records.push(CorrelationRecord {
                    kind: CorrelationKind::SuspiciousImport,
                    severity: Severity::High,
                    details: format!(
                        "{file}:{} imports '{}' ({reason})",
                        import.line, import.source
                    ),
                    files: vec![file.clone()],
                });
            }
        }
    }
    records
}

/// The same category firing in two or more related files.
pub fn attack_chains(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let mut by_category: BTreeMap<&str, BTreeMap<&str, Vec<u32>>> = BTreeMap::new();
    for finding in input.findings {
        by_category
            .entry(&finding.category)
            .or_default()
            .entry(&finding.file)
            .or_default()
            .push(finding.line);
    }

    let mut records = Vec::new();
    for (category, by_file) in &by_category {
        if by_file.len() < 2 {
            continue;
        }
        let files: Vec<&str> = by_file.keys().copied().collect();
        let related = files.iter().enumerate().any(|(i, a)| {
            files[i + 1..].iter().any(|b| {
                input.graph.has_edge(a, b)
                    || input.graph.has_edge(b, a)
                    || dir_of(a) == dir_of(b)
                    || stripped_stem(a) == stripped_stem(b)
            })
        });
        if !related {
            continue;
        }

        let locations: Vec<String> = by_file
            .iter()
            .map(|(file, lines)| {
                let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
                format!("{file}:{}", lines.join(","))
            })
            .collect();
        records.push(CorrelationRecord {
            kind: CorrelationKind::AttackChain,
            severity: Severity::Critical,
            details: format!(
                "category '{category}' across {} related files: {}",
                by_file.len(),
                locations.join("; ")
            ),
            files: by_file.keys().map(|f| f.to_string()).collect(),
        });
    }
    records
}

/// Exfiltration-flavored findings sending to two or more distinct
/// destinations across the corpus.
pub fn distributed_exfiltration(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let mut hosts: BTreeSet<String> = BTreeSet::new();
    let mut contributors: BTreeSet<String> = BTreeSet::new();

    for finding in input.findings {
        let category = finding.category.to_lowercase();
        let evidence = evidence_of(finding);
        let flavored = EXFIL_CATEGORY_TERMS.iter().any(|t| category.contains(t))
            || NETWORK_EVIDENCE.iter().any(|t| evidence.contains(t))
            || ENV_DUMP_EVIDENCE.iter().any(|t| evidence.contains(t));
        if !flavored {
            continue;
        }
        if let Some(captures) = URL_HOST.captures(&evidence) {
            hosts.insert(captures[1].to_string());
            contributors.insert(finding.file.clone());
        }
    }

    if hosts.len() < 2 {
        return Vec::new();
    }
    let host_list: Vec<String> = hosts.iter().cloned().collect();
    vec![CorrelationRecord {
        kind: CorrelationKind::DistributedExfiltration,
        severity: Severity::Critical,
        details: format!(
            "{} distinct destinations ({}) across {} files",
            hosts.len(),
            host_list.join(", "),
            contributors.len()
        ),
        files: contributors.into_iter().collect(),
    }]
}

/// A file carrying both user-input-flavored and external-call-flavored
/// findings, with a processing path of at least three steps through its
/// outgoing edges.
pub fn data_flow_chains(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let mut by_file: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in input.findings {
        by_file.entry(&finding.file).or_default().push(finding);
    }

    let mut records = Vec::new();
    for (file, findings) in &by_file {
        let has_user = findings.iter().any(|f| {
            f.involves_user_input
                || USER_INPUT_EVIDENCE
                    .iter()
                    .any(|t| evidence_of(f).contains(t))
        });
        let has_external = findings.iter().any(|f| {
            f.has_external_data_flow
                || NETWORK_EVIDENCE.iter().any(|t| evidence_of(f).contains(t))
        });
        if !has_user || !has_external {
            continue;
        }

        let processing = input.graph.outgoing(file);
        // input → processing… → output
        let mut path: Vec<String> = Vec::with_capacity(processing.len() + 2);
        path.push(file.to_string());
        path.extend(processing);
        path.push(file.to_string());
        if path.len() < 3 {
            continue;
        }

        let mut files: Vec<String> = path.clone();
        files.sort();
        files.dedup();
        records.push(CorrelationRecord {
            kind: CorrelationKind::DataFlowChain,
            severity: Severity::High,
            details: format!("user input flows {}", path.join(" -> ")),
            files,
        });
    }
    records
}

/// Persistence-flavored findings in two or more files.
pub fn persistence_chains(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let mut by_file: BTreeMap<&str, String> = BTreeMap::new();
    for finding in input.findings {
        let category = finding.category.to_lowercase();
        let evidence = evidence_of(finding);
        let flavored = PERSIST_TERMS
            .iter()
            .any(|t| category.contains(t) || evidence.contains(t));
        if flavored {
            by_file
                .entry(&finding.file)
                .or_insert_with(String::new)
                .push_str(&evidence);
        }
    }
    if by_file.len() < 2 {
        return Vec::new();
    }

    let techniques: Vec<String> = by_file
        .iter()
        .map(|(file, evidence)| format!("{file}: {}", technique_of(evidence)))
        .collect();
    vec![CorrelationRecord {
        kind: CorrelationKind::MultiFilePersistence,
        severity: Severity::Critical,
        details: format!(
            "persistence mechanisms in {} files ({})",
            by_file.len(),
            techniques.join("; ")
        ),
        files: by_file.keys().map(|f| f.to_string()).collect(),
    }]
}

/// Derive a technique label from accumulated evidence keywords.
fn technique_of(evidence: &str) -> &'static str {
    const STARTUP: [&str; 5] = ["startup", "boot", "launchd", "autorun", "rc.local"];
    const INSTALLATION: [&str; 2] = ["install", "setup"];
    const SYSTEM: [&str; 4] = ["registry", "cron", "systemd", "daemon"];
    if STARTUP.iter().any(|t| evidence.contains(t)) {
        "startup"
    } else if INSTALLATION.iter().any(|t| evidence.contains(t)) {
        "installation"
    } else if SYSTEM.iter().any(|t| evidence.contains(t)) {
        "system"
    } else if evidence.contains("service") {
        "service"
    } else {
        "unknown"
    }
}

/// Non-config files whose evidence references config-path-like strings, and
/// config-classified files that themselves carry findings.
pub fn config_injection(input: &CorrelationInput) -> Vec<CorrelationRecord> {
    let markers = &input.config.classifiers.config_markers;
    let mut injecting: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    let mut tampered: BTreeMap<&str, usize> = BTreeMap::new();

    for finding in input.findings {
        if classify::is_config_path(&finding.file, markers) {
            *tampered.entry(&finding.file).or_default() += 1;
        } else {
            let evidence = evidence_of(finding);
            if CONFIG_PATH_REF.is_match(&evidence) || evidence.contains("/etc/") {
                injecting.entry(&finding.file).or_default().push(finding.line);
            }
        }
    }

    let mut records = Vec::new();
    for (file, lines) in &injecting {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        records.push(CorrelationRecord {
            kind: CorrelationKind::ConfigInjection,
            severity: Severity::High,
            details: format!(
                "{file} references configuration paths at line(s) {}",
                lines.join(",")
            ),
            files: vec![file.to_string()],
        });
    }
    for (file, count) in &tampered {
        records.push(CorrelationRecord {
            kind: CorrelationKind::ConfigTampering,
            severity: Severity::High,
            details: format!("configuration file {file} carries {count} finding(s)"),
            files: vec![file.to_string()],
        });
    }
    records
}

fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Basename stem with trailing numeric/underscore suffixes stripped.
fn stripped_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.split('.').next().unwrap_or(name);
    stem.trim_end_matches(|c: char| c.is_ascii_digit() || c == '_')
        .to_lowercase()
}
