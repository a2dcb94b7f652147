//! Heuristic import graph for JavaScript/TypeScript sources.
//!
//! Only relative specifiers are followed. A specifier resolves to the first file
//! (in sorted path order) whose path starts with the normalized target, so
//! `./util` links to `util.ts`, `util/index.ts` or `utility.ts`, whichever sorts first.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::languages::is_script_file;
use crate::repo::{code_files, read_file};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"from\s+['"]([^'"]+)['"]|import\s+['"]([^'"]+)['"]"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Nodes and directed import edges. Cycles and duplicate edges are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Build the graph from `(relative_path, content)` pairs, in the given order.
#[must_use]
pub fn build_graph(files: &[(String, String)]) -> DependencyGraph {
    let nodes: Vec<GraphNode> = files
        .iter()
        .enumerate()
        .map(|(i, (path, _))| GraphNode {
            id: format!("n{i}"),
            label: path.clone(),
            path: path.clone(),
        })
        .collect();

    let mut edges = Vec::new();
    for (node, (path, content)) in nodes.iter().zip(files) {
        for caps in IMPORT_RE.captures_iter(content) {
            let Some(spec) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let spec = spec.as_str();
            if !spec.starts_with('.') {
                continue;
            }
            let resolved = resolve_specifier(path, spec);
            if let Some(target) = nodes.iter().find(|n| n.path.starts_with(&resolved)) {
                edges.push(GraphEdge {
                    source: node.id.clone(),
                    target: target.id.clone(),
                });
            }
        }
    }

    DependencyGraph { nodes, edges }
}

/// POSIX `join(dirname(from), spec)`, normalized.
#[must_use]
pub fn resolve_specifier(from: &str, spec: &str) -> String {
    let mut resolved = match from.rsplit_once('/') {
        Some((dir, _)) => normalize(&format!("{dir}/{spec}")),
        None => normalize(spec),
    };
    if spec.ends_with('/') && !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}

/// Read every script file under `root` and build its graph.
///
/// Unreadable files still become nodes, just without outgoing edges.
pub async fn dependency_graph(root: &Path) -> DependencyGraph {
    let paths: Vec<String> = code_files(root)
        .into_iter()
        .filter(|p| is_script_file(Path::new(p)))
        .collect();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = match read_file(root, &path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %path, error = %e, "skipping unreadable file");
                String::new()
            }
        };
        files.push((path, content));
    }

    let graph = build_graph(&files);
    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "dependency graph built"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(p, c)| ((*p).to_owned(), (*c).to_owned()))
            .collect()
    }

    fn edge_pairs(graph: &DependencyGraph) -> Vec<(&str, &str)> {
        graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }

    #[test]
    fn nodes_are_numbered_in_order() {
        let graph = build_graph(&files(&[("a.ts", ""), ("b/c.tsx", "")]));
        assert_eq!(graph.nodes[0].id, "n0");
        assert_eq!(graph.nodes[1].id, "n1");
        assert_eq!(graph.nodes[1].label, "b/c.tsx");
        assert_eq!(graph.nodes[1].path, "b/c.tsx");
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn resolves_sibling_and_parent_imports() {
        let graph = build_graph(&files(&[
            ("src/app.ts", "import { util } from './util';\nimport cfg from '../config';"),
            ("config.ts", ""),
            ("src/util.ts", ""),
        ]));
        assert_eq!(edge_pairs(&graph), [("n0", "n2"), ("n0", "n1")]);
    }

    #[test]
    fn side_effect_imports_are_followed() {
        let graph = build_graph(&files(&[
            ("index.js", "import \"./polyfill\";"),
            ("polyfill.js", ""),
        ]));
        assert_eq!(edge_pairs(&graph), [("n0", "n1")]);
    }

    #[test]
    fn bare_specifiers_are_ignored() {
        let graph = build_graph(&files(&[
            ("index.js", "import React from 'react';\nimport 'lodash';"),
            ("react.js", ""),
        ]));
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn first_prefix_match_wins() {
        let graph = build_graph(&files(&[
            ("main.ts", "import x from './util';"),
            ("util.ts", ""),
            ("util/index.ts", ""),
            ("utility.ts", ""),
        ]));
        assert_eq!(edge_pairs(&graph), [("n0", "n1")]);
    }

    #[test]
    fn duplicates_and_cycles_are_kept() {
        let graph = build_graph(&files(&[
            ("a.ts", "import './b';\nexport * from './b';"),
            ("b.ts", "import './a';"),
        ]));
        assert_eq!(
            edge_pairs(&graph),
            [("n0", "n1"), ("n0", "n1"), ("n1", "n0")]
        );
    }

    #[test]
    fn unresolved_imports_produce_no_edge() {
        let graph = build_graph(&files(&[("a.ts", "import x from './missing';")]));
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn resolve_specifier_normalizes() {
        assert_eq!(resolve_specifier("src/a.ts", "./b"), "src/b");
        assert_eq!(resolve_specifier("src/deep/a.ts", "../b"), "src/b");
        assert_eq!(resolve_specifier("a.ts", "./b"), "b");
        assert_eq!(resolve_specifier("a.ts", "../b"), "../b");
        assert_eq!(resolve_specifier("src/a.ts", "./"), "src/");
        assert_eq!(resolve_specifier("a.ts", "."), ".");
    }

    #[test]
    fn graph_serializes_plain_fields() {
        let graph = build_graph(&files(&[("a.ts", "import './b';"), ("b.ts", "")]));
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0]["label"], "a.ts");
        assert_eq!(json["edges"][0]["source"], "n0");
        assert_eq!(json["edges"][0]["target"], "n1");
    }

    #[tokio::test]
    async fn dependency_graph_reads_script_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("src/main.ts"), "import { a } from './a';").unwrap();
        std::fs::write(root.join("src/a.ts"), "export const a = 1;").unwrap();
        std::fs::write(root.join("src/tool.py"), "import os").unwrap();
        std::fs::write(root.join("node_modules/lib/x.js"), "").unwrap();

        let graph = dependency_graph(root).await;
        let paths: Vec<_> = graph.nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, ["src/a.ts", "src/main.ts"]);
        assert_eq!(edge_pairs(&graph), [("n1", "n0")]);
    }
}
