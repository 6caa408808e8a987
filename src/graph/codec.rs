//! Portable encodings of the dependency graph.
//!
//! Two shapes exist: the store document (graph identity, node-type counts and
//! graph-level metrics on top of the node/edge lists) and the bare node-link
//! wire form accepted in analysis requests. Both are lossy for parse-level
//! payloads and lossless for graph structure and centralities.

use super::{Centrality, DepGraph, EdgeData, EdgeKind, NodeKind};
use chrono::{SecondsFormat, Utc};
use petgraph::Direction;
use petgraph::algo::{connected_components, is_cyclic_directed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub weight: f64,
}

/// Graph-level metrics stored alongside the node and edge lists. The
/// connectivity fields are omitted for the empty graph, where they have no
/// meaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub density: f64,
    pub is_dag: bool,
    pub number_of_nodes: usize,
    pub number_of_edges: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_degree: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_components: Option<usize>,
}

/// The document persisted in the graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub graph_id: String,
    pub repo_id: String,
    pub branch: String,
    pub created_at: String,
    pub nodes_count: usize,
    pub edges_count: usize,
    pub node_types: BTreeMap<String, usize>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub metrics: GraphMetrics,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// Node-link wire form, as supplied in `dependency_graph` request fields.
/// Missing optional fields default to `0` / `"unknown"` / `1` on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinkDocument {
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    #[serde(default)]
    pub graph: serde_json::Value,
    #[serde(default)]
    pub nodes: Vec<NodeLinkNode>,
    #[serde(default)]
    pub links: Vec<NodeLinkLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinkNode {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub degree_centrality: f64,
    #[serde(default)]
    pub betweenness_centrality: f64,
    #[serde(default)]
    pub closeness_centrality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinkLink {
    pub source: String,
    pub target: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Encode a built graph into a store document.
pub fn encode(graph: &DepGraph, repo_id: &str, branch: &str) -> GraphDocument {
    let mut node_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut nodes = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        *node_types.entry(node.kind.as_str().to_string()).or_insert(0) += 1;
        nodes.push(NodeRecord {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
            degree_centrality: node.centrality.degree,
            betweenness_centrality: node.centrality.betweenness,
            closeness_centrality: node.centrality.closeness,
        });
    }

    let edges = graph
        .edges()
        .map(|(source, target, data)| EdgeRecord {
            source: source.to_string(),
            target: target.to_string(),
            kind: data.kind.as_str().to_string(),
            weight: data.weight,
        })
        .collect();

    GraphDocument {
        graph_id: Uuid::new_v4().to_string(),
        repo_id: repo_id.to_string(),
        branch: branch.to_string(),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        nodes_count: graph.node_count(),
        edges_count: graph.edge_count(),
        node_types,
        nodes,
        edges,
        metrics: graph_metrics(graph),
    }
}

/// Decode a store document back into a graph.
pub fn decode(document: &GraphDocument) -> DepGraph {
    restore(
        document.nodes.iter().map(|n| {
            (
                n.id.as_str(),
                NodeKind::from_wire(&n.kind),
                Centrality {
                    degree: n.degree_centrality,
                    betweenness: n.betweenness_centrality,
                    closeness: n.closeness_centrality,
                },
            )
        }),
        document.edges.iter().map(|e| {
            (
                e.source.as_str(),
                e.target.as_str(),
                EdgeKind::from_wire(&e.kind),
                e.weight,
            )
        }),
    )
}

/// Convert a graph to the node-link wire form.
pub fn to_node_link(graph: &DepGraph) -> NodeLinkDocument {
    NodeLinkDocument {
        directed: true,
        multigraph: false,
        graph: serde_json::json!({}),
        nodes: graph
            .nodes()
            .map(|node| NodeLinkNode {
                id: node.id.clone(),
                kind: Some(node.kind.as_str().to_string()),
                degree_centrality: node.centrality.degree,
                betweenness_centrality: node.centrality.betweenness,
                closeness_centrality: node.centrality.closeness,
            })
            .collect(),
        links: graph
            .edges()
            .map(|(source, target, data)| NodeLinkLink {
                source: source.to_string(),
                target: target.to_string(),
                kind: Some(data.kind.as_str().to_string()),
                weight: data.weight,
            })
            .collect(),
    }
}

/// Decode a node-link document into a graph.
pub fn from_node_link(document: &NodeLinkDocument) -> DepGraph {
    restore(
        document.nodes.iter().map(|n| {
            (
                n.id.as_str(),
                NodeKind::from_wire(n.kind.as_deref().unwrap_or("unknown")),
                Centrality {
                    degree: n.degree_centrality,
                    betweenness: n.betweenness_centrality,
                    closeness: n.closeness_centrality,
                },
            )
        }),
        document.links.iter().map(|l| {
            (
                l.source.as_str(),
                l.target.as_str(),
                EdgeKind::from_wire(l.kind.as_deref().unwrap_or("unknown")),
                l.weight,
            )
        }),
    )
}

fn restore<'a>(
    nodes: impl Iterator<Item = (&'a str, NodeKind, Centrality)>,
    edges: impl Iterator<Item = (&'a str, &'a str, EdgeKind, f64)>,
) -> DepGraph {
    let mut graph = DepGraph::default();
    for (id, kind, centrality) in nodes {
        let parent_file = match kind {
            NodeKind::File => None,
            _ => id.split_once("::").map(|(path, _)| path.to_string()),
        };
        graph.add_node(id.to_string(), kind, parent_file);
        if let Some(&idx) = graph.ids.get(id) {
            graph.graph[idx].centrality = centrality;
        }
    }
    for (source, target, kind, weight) in edges {
        // Links naming unknown nodes are tolerated: the endpoints are
        // materialized with unknown kind, matching node-link semantics.
        for endpoint in [source, target] {
            if !graph.contains(endpoint) {
                graph.add_node(endpoint.to_string(), NodeKind::Unknown, None);
            }
        }
        graph.add_edge(
            source,
            target,
            EdgeData {
                kind,
                import: None,
                weight,
            },
        );
    }
    graph
}

/// Compute graph-level metrics for the store document.
pub fn graph_metrics(graph: &DepGraph) -> GraphMetrics {
    let n = graph.node_count();
    let e = graph.edge_count();
    let raw = graph.raw();

    let density = if n > 1 {
        e as f64 / (n as f64 * (n - 1) as f64)
    } else {
        0.0
    };

    let mut metrics = GraphMetrics {
        density,
        is_dag: !is_cyclic_directed(raw),
        number_of_nodes: n,
        number_of_edges: e,
        average_degree: None,
        is_connected: None,
        diameter: None,
        number_of_components: None,
    };

    if n == 0 {
        return metrics;
    }

    metrics.average_degree = Some(2.0 * e as f64 / n as f64);

    let components = connected_components(raw);
    if components == 1 {
        metrics.is_connected = Some(true);
        metrics.diameter = Some(undirected_diameter(graph));
    } else {
        metrics.is_connected = Some(false);
        metrics.number_of_components = Some(components);
    }
    metrics
}

/// Diameter of the undirected view: the largest BFS eccentricity.
fn undirected_diameter(graph: &DepGraph) -> usize {
    let raw = graph.raw();
    let n = raw.node_count();
    let mut diameter = 0;
    for start in raw.node_indices() {
        let mut dist: Vec<i64> = vec![-1; n];
        dist[start.index()] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            for w in raw
                .neighbors_directed(v, Direction::Outgoing)
                .chain(raw.neighbors_directed(v, Direction::Incoming))
            {
                if dist[w.index()] < 0 {
                    dist[w.index()] = dist[v.index()] + 1;
                    diameter = diameter.max(dist[w.index()] as usize);
                    queue.push_back(w);
                }
            }
        }
    }
    diameter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph;
    use crate::model::{ImportKind, ImportRef, Language, ParseResult, ParseResults};
    use std::collections::BTreeMap;

    fn sample_graph() -> DepGraph {
        let mut results = ParseResults::new();
        let mut a = ParseResult::empty(Language::Python);
        a.imports.push(ImportRef {
            name: "b".to_string(),
            alias: None,
            module: None,
            kind: ImportKind::Plain,
        });
        a.functions.push(crate::model::FuncDef {
            name: "run".to_string(),
            line: 3,
            decorators: Vec::new(),
            args: Vec::new(),
        });
        results.insert("a.py".to_string(), a);
        results.insert("b.py".to_string(), ParseResult::empty(Language::Python));
        graph::build(&results)
    }

    fn node_snapshot(graph: &DepGraph) -> BTreeMap<String, (NodeKind, Centrality)> {
        graph
            .nodes()
            .map(|n| (n.id.clone(), (n.kind, n.centrality)))
            .collect()
    }

    fn edge_snapshot(graph: &DepGraph) -> Vec<(String, String, EdgeKind)> {
        let mut edges: Vec<_> = graph
            .edges()
            .map(|(s, t, d)| (s.to_string(), t.to_string(), d.kind))
            .collect();
        edges.sort();
        edges
    }

    #[test]
    fn decode_restores_structure_and_centralities() {
        let original = sample_graph();
        let document = encode(&original, "repo", "main");
        let decoded = decode(&document);

        assert_eq!(node_snapshot(&original), node_snapshot(&decoded));
        assert_eq!(edge_snapshot(&original), edge_snapshot(&decoded));
    }

    #[test]
    fn node_link_round_trip_preserves_structure() {
        let original = sample_graph();
        let wire = to_node_link(&original);
        assert!(wire.directed);
        assert!(!wire.multigraph);
        let decoded = from_node_link(&wire);
        assert_eq!(node_snapshot(&original), node_snapshot(&decoded));
        assert_eq!(edge_snapshot(&original), edge_snapshot(&decoded));
    }

    #[test]
    fn node_link_decode_defaults_missing_fields() {
        let raw = serde_json::json!({
            "directed": true,
            "multigraph": false,
            "graph": {},
            "nodes": [{"id": "x.py"}, {"id": "y.py"}],
            "links": [{"source": "x.py", "target": "y.py"}],
        });
        let document: NodeLinkDocument = serde_json::from_value(raw).unwrap();
        let graph = from_node_link(&document);
        let node = graph.node("x.py").unwrap();
        assert_eq!(node.kind, NodeKind::Unknown);
        assert_eq!(node.centrality, Centrality::default());
        let (_, _, data) = graph.edges().next().unwrap();
        assert_eq!(data.kind, EdgeKind::Unknown);
        assert_eq!(data.weight, 1.0);
    }

    #[test]
    fn document_counts_and_types() {
        let graph = sample_graph();
        let document = encode(&graph, "repo", "main");
        assert_eq!(document.nodes_count, 3);
        assert_eq!(document.edges_count, 1);
        assert_eq!(document.node_types.get("file"), Some(&2));
        assert_eq!(document.node_types.get("function"), Some(&1));
        assert_eq!(document.repo_id, "repo");
        assert_eq!(document.branch, "main");
        assert!(!document.graph_id.is_empty());
    }

    #[test]
    fn metrics_on_connected_chain() {
        let graph = sample_graph();
        let metrics = graph_metrics(&graph);
        assert!(metrics.is_dag);
        assert_eq!(metrics.number_of_nodes, 3);
        assert_eq!(metrics.number_of_edges, 1);
        assert_eq!(metrics.is_connected, Some(false));
        assert_eq!(metrics.number_of_components, Some(2));
    }

    #[test]
    fn metrics_on_empty_graph() {
        let graph = DepGraph::default();
        let metrics = graph_metrics(&graph);
        assert_eq!(metrics.density, 0.0);
        assert!(metrics.is_dag);
        assert_eq!(metrics.average_degree, None);
        assert_eq!(metrics.is_connected, None);
    }
}
