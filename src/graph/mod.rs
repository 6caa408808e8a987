//! Dependency graph construction over parsed source artifacts.
//!
//! The graph is built in two passes (nodes, then import edges), gets its
//! centrality metrics attached once, and is frozen afterwards: nothing
//! outside this module can mutate a built [`DepGraph`], so read-only handles
//! can be shared across threads without locks.

pub mod centrality;
pub mod codec;

use crate::model::{ImportRef, ParseResults};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Node kind. `Unknown` only appears when decoding documents produced by
/// other tools; the builder never emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Function,
    Class,
    AsyncFunction,
    Unknown,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::AsyncFunction => "async_function",
            NodeKind::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "file" => NodeKind::File,
            "function" => NodeKind::Function,
            "class" => NodeKind::Class,
            "async_function" => NodeKind::AsyncFunction,
            _ => NodeKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeKind {
    Import,
    Unknown,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Import => "import",
            EdgeKind::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "import" => EdgeKind::Import,
            _ => EdgeKind::Unknown,
        }
    }
}

/// Precomputed centrality metrics, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Centrality {
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: String,
    pub kind: NodeKind,
    pub parent_file: Option<String>,
    pub centrality: Centrality,
}

#[derive(Debug, Clone)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub import: Option<ImportRef>,
    pub weight: f64,
}

/// A frozen directed dependency graph over file and symbol nodes.
#[derive(Debug, Default)]
pub struct DepGraph {
    graph: DiGraph<NodeData, EdgeData>,
    ids: HashMap<String, NodeIndex>,
}

impl DepGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.ids.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.id.as_str())
    }

    /// Edges as `(source id, target id, data)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edge_indices().filter_map(|e| {
            let (src, dst) = self.graph.edge_endpoints(e)?;
            Some((
                self.graph[src].id.as_str(),
                self.graph[dst].id.as_str(),
                &self.graph[e],
            ))
        })
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.ids
            .get(id)
            .map(|idx| {
                self.graph
                    .edges_directed(*idx, Direction::Incoming)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.ids
            .get(id)
            .map(|idx| {
                self.graph
                    .edges_directed(*idx, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Largest total degree in the graph, clamped to at least 1.
    pub fn max_degree(&self) -> usize {
        self.graph
            .node_indices()
            .map(|idx| {
                self.graph.edges_directed(idx, Direction::Incoming).count()
                    + self.graph.edges_directed(idx, Direction::Outgoing).count()
            })
            .max()
            .unwrap_or(0)
            .max(1)
    }

    /// All nodes reachable from `id` over outgoing edges, excluding `id`.
    pub fn descendants(&self, id: &str) -> BTreeSet<String> {
        self.reachable(id, Direction::Outgoing)
    }

    /// All nodes that can reach `id` over directed edges, excluding `id`.
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        self.reachable(id, Direction::Incoming)
    }

    fn reachable(&self, id: &str, direction: Direction) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Some(&start) = self.ids.get(id) else {
            return out;
        };
        let mut visited = vec![false; self.graph.node_count()];
        visited[start.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, direction) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    out.insert(self.graph[next].id.clone());
                    queue.push_back(next);
                }
            }
        }
        out
    }

    fn add_node(&mut self, id: String, kind: NodeKind, parent_file: Option<String>) {
        if let Some(&idx) = self.ids.get(&id) {
            // Same id contributed by several symbol lists: last writer wins.
            self.graph[idx].kind = kind;
            return;
        }
        let idx = self.graph.add_node(NodeData {
            id: id.clone(),
            kind,
            parent_file,
            centrality: Centrality::default(),
        });
        self.ids.insert(id, idx);
    }

    fn add_edge(&mut self, source: &str, target: &str, data: EdgeData) {
        let (Some(&src), Some(&dst)) = (self.ids.get(source), self.ids.get(target)) else {
            return;
        };
        // Duplicate edges collapse; the first payload is retained.
        if self.graph.find_edge(src, dst).is_none() {
            self.graph.add_edge(src, dst, data);
        }
    }

    fn attach_centralities(&mut self) {
        let degree = centrality::degree(&self.graph);
        let betweenness = centrality::betweenness(&self.graph);
        let closeness = centrality::closeness(&self.graph);
        for idx in self.graph.node_indices() {
            let i = idx.index();
            self.graph[idx].centrality = Centrality {
                degree: sanitize(degree[i]),
                betweenness: sanitize(betweenness[i]),
                closeness: sanitize(closeness[i]),
            };
        }
    }

    pub(crate) fn raw(&self) -> &DiGraph<NodeData, EdgeData> {
        &self.graph
    }
}

/// Clamp a centrality value into `[0, 1]`; numerical degeneracy becomes 0.
fn sanitize(value: f64) -> f64 {
    if !value.is_finite() {
        tracing::warn!(value, "degenerate centrality value, defaulting to 0");
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Build a dependency graph from a set of parse results.
///
/// Files whose parse carries an `error` tag are excluded entirely. The input
/// map iterates in sorted path order, so node and edge sets do not depend on
/// how the artifact set was produced.
pub fn build(results: &ParseResults) -> DepGraph {
    let mut dep = DepGraph::default();

    // First pass: file nodes, then symbol nodes per file.
    for (path, result) in results {
        if result.error.is_some() {
            tracing::debug!(%path, "skipping errored file");
            continue;
        }
        dep.add_node(path.clone(), NodeKind::File, None);
        for func in &result.functions {
            dep.add_node(
                format!("{path}::{}", func.name),
                NodeKind::Function,
                Some(path.clone()),
            );
        }
        for class in &result.classes {
            dep.add_node(
                format!("{path}::{}", class.name),
                NodeKind::Class,
                Some(path.clone()),
            );
        }
        for func in &result.async_functions {
            dep.add_node(
                format!("{path}::{}", func.name),
                NodeKind::AsyncFunction,
                Some(path.clone()),
            );
        }
    }

    // Second pass: import edges. Candidates stay in lexicographic order so
    // first-match resolution is reproducible.
    let files: Vec<&String> = results
        .iter()
        .filter(|(_, result)| result.error.is_none())
        .map(|(path, _)| path)
        .collect();

    for (path, result) in results {
        if result.error.is_some() {
            continue;
        }
        for import in &result.imports {
            let Some(target) = resolve_import(&import.name, &files) else {
                continue;
            };
            if target == path {
                continue;
            }
            dep.add_edge(
                path,
                target,
                EdgeData {
                    kind: EdgeKind::Import,
                    import: Some(import.clone()),
                    weight: 1.0,
                },
            );
        }
    }

    dep.attach_centralities();
    tracing::info!(
        nodes = dep.node_count(),
        edges = dep.edge_count(),
        "dependency graph built"
    );
    dep
}

/// Resolve an import name to a file path.
///
/// Picks the first candidate, in lexicographic order, for which the import
/// name is a substring of the path, or the dotted form of the path starts
/// with the import name.
fn resolve_import<'a>(name: &str, files: &[&'a String]) -> Option<&'a String> {
    files
        .iter()
        .find(|path| path.contains(name) || path.replace('/', ".").starts_with(name))
        .copied()
}
