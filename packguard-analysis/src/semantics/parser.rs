//! tree-sitter extraction of [`FileAnalysis`] summaries.
//!
//! One explicit walker per language family, each enumerating one case per
//! syntax-node kind and accumulating into a single summary, so no handler
//! can shadow another. Unsupported dialects and trees containing syntax
//! errors are reported as `ParseError` and the caller fails open.

use std::path::PathBuf;

use tree_sitter::{Language, Node, Parser};

use packguard_core::config::FlowLists;
use packguard_core::errors::ParseError;

use super::summary::{
    CallSite, Export, FileAnalysis, FlowPoint, FunctionDef, Import, ImportKind, VarDecl,
};

/// Language families with a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    JavaScript,
    TypeScript,
    Tsx,
    Python,
}

impl Dialect {
    fn from_path(path: &str) -> Option<Dialect> {
        let ext = path.rsplit('.').next()?;
        match ext {
            "js" | "jsx" | "mjs" | "cjs" => Some(Dialect::JavaScript),
            "ts" | "mts" | "cts" => Some(Dialect::TypeScript),
            "tsx" => Some(Dialect::Tsx),
            "py" | "pyi" => Some(Dialect::Python),
            _ => None,
        }
    }

    fn grammar(&self) -> Language {
        match self {
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// Parse one file into its structural summary.
pub fn parse_file(path: &str, content: &str, flow: &FlowLists) -> Result<FileAnalysis, ParseError> {
    let dialect =
        Dialect::from_path(path).ok_or_else(|| ParseError::UnsupportedLanguage(PathBuf::from(path)))?;

    let mut parser = Parser::new();
    parser
        .set_language(&dialect.grammar())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| ParseError::Syntax(PathBuf::from(path)))?;
    if tree.root_node().has_error() {
        return Err(ParseError::Syntax(PathBuf::from(path)));
    }

    let mut analysis = FileAnalysis::default();
    match dialect {
        Dialect::Python => walk_python(tree.root_node(), content, 0, &mut analysis),
        _ => walk_js(tree.root_node(), content, &mut analysis),
    }
    sketch_flow(&mut analysis, flow);
    Ok(analysis)
}

fn text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line_of(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

/// Leftmost object of a member access chain.
fn member_root<'t>(mut node: Node<'t>) -> Node<'t> {
    while let Some(object) = node.child_by_field_name("object") {
        node = object;
    }
    node
}

fn walk_js(node: Node, src: &str, out: &mut FileAnalysis) {
    match node.kind() {
        "import_statement" => {
            if let Some(source) = node.child_by_field_name("source") {
                out.imports.push(Import {
                    source: unquote(text(source, src)),
                    kind: ImportKind::Static,
                    line: line_of(node),
                });
            }
        }
        "call_expression" => {
            let callee = node.child_by_field_name("function");
            let args: Vec<String> = node
                .child_by_field_name("arguments")
                .map(|a| {
                    let mut cursor = a.walk();
                    a.named_children(&mut cursor)
                        .map(|c| text(c, src).to_string())
                        .collect()
                })
                .unwrap_or_default();

            if let Some(callee) = callee {
                let callee_text = text(callee, src).to_string();
                if callee.kind() == "import" {
                    // Dynamic import: import(expr)
                    out.imports.push(Import {
                        source: unquote(args.first().map(String::as_str).unwrap_or("")),
                        kind: ImportKind::Dynamic,
                        line: line_of(node),
                    });
                } else if callee_text == "require" {
                    out.imports.push(Import {
                        source: unquote(args.first().map(String::as_str).unwrap_or("")),
                        kind: ImportKind::Require,
                        line: line_of(node),
                    });
                }
                out.calls.push(CallSite {
                    callee: callee_text,
                    args,
                    line: line_of(node),
                });
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.functions.push(FunctionDef {
                    name: text(name, src).to_string(),
                    start_line: line_of(node),
                    end_line: end_line_of(node),
                });
            }
        }
        "method_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.functions.push(FunctionDef {
                    name: text(name, src).to_string(),
                    start_line: line_of(node),
                    end_line: end_line_of(node),
                });
            }
        }
        "variable_declarator" => {
            if let Some(name) = node.child_by_field_name("name") {
                if name.kind() == "identifier" {
                    out.variables.push(VarDecl {
                        name: text(name, src).to_string(),
                        line: line_of(node),
                    });
                    // A function-valued declarator names a function.
                    if let Some(value) = node.child_by_field_name("value") {
                        if matches!(value.kind(), "arrow_function" | "function_expression") {
                            out.functions.push(FunctionDef {
                                name: text(name, src).to_string(),
                                start_line: line_of(node),
                                end_line: end_line_of(value),
                            });
                        }
                    }
                }
            }
        }
        "export_statement" => {
            let line = line_of(node);
            collect_js_exports(node, src, line, out);
        }
        "assignment_expression" => {
            // CommonJS: module.exports = ... / exports.name = ...
            if let Some(left) = node.child_by_field_name("left") {
                let left_text = text(left, src);
                if left_text == "module.exports" {
                    if let Some(right) = node.child_by_field_name("right") {
                        collect_object_exports(right, src, line_of(node), out);
                    }
                } else if let Some(name) = left_text.strip_prefix("exports.") {
                    out.exports.push(Export {
                        name: name.to_string(),
                        line: line_of(node),
                    });
                }
            }
        }
        "member_expression" => {
            let root = member_root(node);
            if root.kind() == "identifier" {
                // Recorded raw; classified into the sketch afterwards.
                out.flow.user_input_sources.push(FlowPoint {
                    expression: text(node, src).to_string(),
                    line: line_of(node),
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_js(child, src, out);
    }
}

fn collect_js_exports(node: Node, src: &str, line: u32, out: &mut FileAnalysis) {
    if let Some(declaration) = node.child_by_field_name("declaration") {
        match declaration.kind() {
            "function_declaration" | "generator_function_declaration" | "class_declaration" => {
                if let Some(name) = declaration.child_by_field_name("name") {
                    out.exports.push(Export {
                        name: text(name, src).to_string(),
                        line,
                    });
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = declaration.walk();
                for child in declaration.named_children(&mut cursor) {
                    if child.kind() == "variable_declarator" {
                        if let Some(name) = child.child_by_field_name("name") {
                            out.exports.push(Export {
                                name: text(name, src).to_string(),
                                line,
                            });
                        }
                    }
                }
            }
            _ => {
                out.exports.push(Export {
                    name: "default".to_string(),
                    line,
                });
            }
        }
        return;
    }

    // export { a, b as c }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "export_clause" {
            let mut inner = child.walk();
            for specifier in child.named_children(&mut inner) {
                if specifier.kind() == "export_specifier" {
                    if let Some(name) = specifier.child_by_field_name("name") {
                        out.exports.push(Export {
                            name: text(name, src).to_string(),
                            line,
                        });
                    }
                }
            }
        }
    }
}

/// Shorthand identifiers of `module.exports = { a, b }`.
fn collect_object_exports(node: Node, src: &str, line: u32, out: &mut FileAnalysis) {
    if node.kind() != "object" {
        out.exports.push(Export {
            name: "default".to_string(),
            line,
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "shorthand_property_identifier" => out.exports.push(Export {
                name: text(child, src).to_string(),
                line,
            }),
            "pair" => {
                if let Some(key) = child.child_by_field_name("key") {
                    out.exports.push(Export {
                        name: unquote(text(key, src)),
                        line,
                    });
                }
            }
            _ => {}
        }
    }
}

fn walk_python(node: Node, src: &str, depth: usize, out: &mut FileAnalysis) {
    let mut child_depth = depth;
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let name = match child.kind() {
                    "dotted_name" => Some(text(child, src).to_string()),
                    "aliased_import" => child
                        .child_by_field_name("name")
                        .map(|n| text(n, src).to_string()),
                    _ => None,
                };
                if let Some(source) = name {
                    out.imports.push(Import {
                        source,
                        kind: ImportKind::Static,
                        line: line_of(node),
                    });
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                out.imports.push(Import {
                    source: text(module, src).to_string(),
                    kind: ImportKind::Static,
                    line: line_of(node),
                });
            }
        }
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = text(name, src).to_string();
                out.functions.push(FunctionDef {
                    name: name.clone(),
                    start_line: line_of(node),
                    end_line: end_line_of(node),
                });
                // Module-level definitions are importable, hence exported.
                if depth == 0 {
                    out.exports.push(Export {
                        name,
                        line: line_of(node),
                    });
                }
            }
            child_depth = depth + 1;
        }
        "class_definition" => {
            child_depth = depth + 1;
        }
        "call" => {
            let args: Vec<String> = node
                .child_by_field_name("arguments")
                .map(|a| {
                    let mut cursor = a.walk();
                    a.named_children(&mut cursor)
                        .map(|c| text(c, src).to_string())
                        .collect()
                })
                .unwrap_or_default();
            if let Some(callee) = node.child_by_field_name("function") {
                out.calls.push(CallSite {
                    callee: text(callee, src).to_string(),
                    args,
                    line: line_of(node),
                });
            }
        }
        "attribute" => {
            let root = member_root(node);
            if root.kind() == "identifier" {
                out.flow.user_input_sources.push(FlowPoint {
                    expression: text(node, src).to_string(),
                    line: line_of(node),
                });
            }
        }
        "assignment" => {
            if let Some(left) = node.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    out.variables.push(VarDecl {
                        name: text(left, src).to_string(),
                        line: line_of(node),
                    });
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_python(child, src, child_depth, out);
    }
}

/// Classify the raw walk output into the data-flow sketch: keep only member
/// accesses rooted at request-like identifiers, and derive external/sensitive
/// call sites from the configured vocabularies.
fn sketch_flow(analysis: &mut FileAnalysis, flow: &FlowLists) {
    let raw = std::mem::take(&mut analysis.flow.user_input_sources);
    analysis.flow.user_input_sources = raw
        .into_iter()
        .filter(|p| {
            let root = p
                .expression
                .split(['.', '[', '('])
                .next()
                .unwrap_or("");
            flow.user_input_roots.iter().any(|r| r == root)
        })
        .collect();

    for call in &analysis.calls {
        let point = FlowPoint {
            expression: call.callee.clone(),
            line: call.line,
        };
        if flow.network_calls.iter().any(|n| call.callee.contains(n.as_str())) {
            analysis.flow.external_calls.push(point.clone());
        }
        if flow
            .sensitive_calls
            .iter()
            .any(|s| call.callee.contains(s.as_str()))
        {
            analysis.flow.sensitive_ops.push(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, content: &str) -> FileAnalysis {
        parse_file(path, content, &FlowLists::default()).unwrap()
    }

    #[test]
    fn unsupported_dialect_is_an_error() {
        let err = parse_file("main.go", "package main", &FlowLists::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedLanguage(_)));
    }

    #[test]
    fn syntax_errors_fail_open_upstream() {
        let err = parse_file("bad.js", "function ((((", &FlowLists::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn extracts_js_imports_functions_and_calls() {
        let src = "\
import axios from 'axios';\n\
const helper = require('./helper');\n\
\n\
export function sendReport(data) {\n\
  return axios.post('https://collect.example.com', data);\n\
}\n";
        let analysis = parse("src/report.js", src);

        assert_eq!(analysis.imports.len(), 2);
        assert_eq!(analysis.imports[0].source, "axios");
        assert_eq!(analysis.imports[0].kind, ImportKind::Static);
        assert_eq!(analysis.imports[1].source, "./helper");
        assert_eq!(analysis.imports[1].kind, ImportKind::Require);

        let func = analysis.functions.iter().find(|f| f.name == "sendReport").unwrap();
        assert_eq!(func.start_line, 4);
        assert_eq!(func.end_line, 6);
        assert!(analysis.exports.iter().any(|e| e.name == "sendReport"));

        assert!(analysis.calls.iter().any(|c| c.callee == "axios.post"));
        // axios.post names a network call → external flow.
        assert!(!analysis.flow.external_calls.is_empty());
    }

    #[test]
    fn request_rooted_member_access_is_user_input() {
        let src = "function handle(req) {\n  process(req.body.data);\n}\n";
        let analysis = parse("src/handler.js", src);
        assert!(analysis
            .flow
            .user_input_sources
            .iter()
            .any(|p| p.expression == "req.body.data"));
        // `other.thing` is not request-rooted.
        let src2 = "function f(other) {\n  use(other.thing);\n}\n";
        let analysis2 = parse("src/f.js", src2);
        assert!(analysis2.flow.user_input_sources.is_empty());
    }

    #[test]
    fn sensitive_calls_are_sketched() {
        let src = "const cp = require('child_process');\ncp.execSync(cmd);\n";
        let analysis = parse("src/run.js", src);
        assert!(!analysis.flow.sensitive_ops.is_empty());
    }

    #[test]
    fn extracts_python_definitions() {
        let src = "\
import os\n\
from urllib import request\n\
\n\
def fetch_remote(url):\n\
    return request.urlopen(url)\n";
        let analysis = parse("tool.py", src);
        assert_eq!(analysis.imports.len(), 2);
        assert_eq!(analysis.imports[1].source, "urllib");
        let func = analysis.functions.iter().find(|f| f.name == "fetch_remote").unwrap();
        assert_eq!(func.start_line, 4);
        // Module-level def is importable → exported.
        assert!(analysis.exports.iter().any(|e| e.name == "fetch_remote"));
        assert!(analysis.calls.iter().any(|c| c.callee == "request.urlopen"));
    }

    #[test]
    fn dynamic_import_is_recorded() {
        let src = "const mod = import('./plugin');\n";
        let analysis = parse("src/load.js", src);
        assert!(analysis
            .imports
            .iter()
            .any(|i| i.kind == ImportKind::Dynamic && i.source == "./plugin"));
    }
}
