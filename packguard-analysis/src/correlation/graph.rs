//! Cross-file dependency graph.
//!
//! Directed `file → file` edges inferred by resolving each import's source
//! text against other files' exported names or basenames. Built once per run
//! from the raw content snapshot, independent of any parsed summary, so it
//! exists even for files the grammar cannot handle.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::scanner::FileSet;

/// One textually extracted import.
#[derive(Debug, Clone)]
pub struct RawImport {
    /// Unresolved source text (path, module name, or identifier).
    pub source: String,
    /// Identifier argument of a non-literal dynamic import, when present.
    pub dynamic_ident: Option<String>,
    pub line: u32,
}

static ES_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+[^;'"]*?from\s+['"]([^'"]+)['"]"#).unwrap());
static ES_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static DYNAMIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static DYNAMIC_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimport\s*\(\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\)").unwrap());
static PY_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*from\s+([\w.]+)\s+import\b").unwrap());
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+([\w.]+)").unwrap());
static JS_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:default\s+)?(?:async\s+)?(?:function\*?|class|const|let|var)\s+(\w+)")
        .unwrap()
});

/// The run's dependency graph plus the raw imports it was built from.
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: FxHashMap<String, NodeIndex>,
    /// Raw imports per file, in path order.
    imports: BTreeMap<String, Vec<RawImport>>,
}

impl DependencyGraph {
    /// Build from the content snapshot. Nodes and edges are inserted in
    /// sorted order so traversal output is deterministic.
    pub fn build(files: &FileSet) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes: FxHashMap<String, NodeIndex> = FxHashMap::default();
        for file in files.iter() {
            let idx = graph.add_node(file.path.clone());
            nodes.insert(file.path.clone(), idx);
        }

        // Resolution tables: basename stem → files, exported name → files.
        let mut by_stem: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut by_export: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for file in files.iter() {
            by_stem
                .entry(stem(&file.path))
                .or_default()
                .insert(file.path.clone());
            for m in JS_EXPORT.captures_iter(&file.content) {
                by_export
                    .entry(m[1].to_string())
                    .or_default()
                    .insert(file.path.clone());
            }
        }

        let mut imports: BTreeMap<String, Vec<RawImport>> = BTreeMap::new();
        for file in files.iter() {
            let raw = extract_imports(&file.path, &file.content);
            for import in &raw {
                let key = stem(&import.source);
                let mut targets: BTreeSet<&String> = BTreeSet::new();
                if let Some(found) = by_stem.get(&key) {
                    targets.extend(found);
                }
                if let Some(found) = by_export.get(&key) {
                    targets.extend(found);
                }
                for target in targets {
                    if *target != file.path {
                        let from = nodes[&file.path];
                        let to = nodes[target];
                        if graph.find_edge(from, to).is_none() {
                            graph.add_edge(from, to, ());
                        }
                    }
                }
            }
            imports.insert(file.path.clone(), raw);
        }

        Self {
            graph,
            nodes,
            imports,
        }
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Files reachable over one outgoing edge, sorted.
    pub fn outgoing(&self, file: &str) -> Vec<String> {
        let Some(&idx) = self.nodes.get(file) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Raw imports per file, in path order.
    pub fn imports(&self) -> &BTreeMap<String, Vec<RawImport>> {
        &self.imports
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Extract raw imports textually, per dialect family.
fn extract_imports(path: &str, content: &str) -> Vec<RawImport> {
    let mut raw: Vec<(usize, RawImport)> = Vec::new();
    let python = path.ends_with(".py") || path.ends_with(".pyi");

    let mut push = |offset: usize, source: &str, dynamic_ident: Option<String>| {
        raw.push((
            offset,
            RawImport {
                source: source.to_string(),
                dynamic_ident,
                line: line_at(content, offset),
            },
        ));
    };

    if python {
        for c in PY_FROM.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
        for c in PY_IMPORT.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
    } else {
        for c in ES_FROM.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
        for c in ES_BARE.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
        for c in REQUIRE.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
        for c in DYNAMIC_LITERAL.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], None);
        }
        for c in DYNAMIC_IDENT.captures_iter(content) {
            push(c.get(0).unwrap().start(), &c[1], Some(c[1].to_string()));
        }
    }

    raw.sort_by_key(|(offset, _)| *offset);
    raw.into_iter().map(|(_, i)| i).collect()
}

/// Basename stem of a path-like or module-like source string, lowercased.
fn stem(source: &str) -> String {
    let tail = source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source);
    // Python dotted modules resolve on their last segment too.
    let tail = tail.rsplit("::").next().unwrap_or(tail);
    let tail = match tail.rfind('.') {
        // Keep dotless names and python "pkg.mod" last segments intact.
        Some(i) if tail[i + 1..].chars().all(|c| c.is_ascii_alphanumeric()) && i > 0 => {
            if is_known_ext(&tail[i + 1..]) {
                &tail[..i]
            } else {
                tail.rsplit('.').next().unwrap_or(tail)
            }
        }
        _ => tail,
    };
    tail.to_lowercase()
}

fn is_known_ext(ext: &str) -> bool {
    matches!(
        ext,
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" | "py" | "pyi" | "json"
    )
}

fn line_at(content: &str, offset: usize) -> u32 {
    content[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1
}
