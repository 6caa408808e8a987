//! Centrality metrics over the dependency graph.
//!
//! Betweenness uses Brandes' algorithm over unweighted shortest paths.
//! Normalization follows the conventions of directed graphs: betweenness is
//! scaled by 1/((n-1)(n-2)) and closeness uses incoming-path distances with
//! the reachable-fraction correction, so partially connected graphs do not
//! inflate scores.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;

/// Degree centrality: total degree over `n - 1`. Zero for graphs with fewer
/// than two nodes.
pub fn degree<N, E>(graph: &DiGraph<N, E>) -> Vec<f64> {
    let n = graph.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let denom = (n - 1) as f64;
    graph
        .node_indices()
        .map(|idx| {
            let total = graph.edges_directed(idx, Direction::Incoming).count()
                + graph.edges_directed(idx, Direction::Outgoing).count();
            total as f64 / denom
        })
        .collect()
}

/// Betweenness centrality via Brandes' algorithm on the directed graph.
pub fn betweenness<N, E>(graph: &DiGraph<N, E>) -> Vec<f64> {
    let n = graph.node_count();
    let mut cb = vec![0.0_f64; n];
    if n < 3 {
        return cb;
    }

    for s in graph.node_indices() {
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        sigma[s.index()] = 1.0;
        let mut dist: Vec<i64> = vec![-1; n];
        dist[s.index()] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for w in graph.neighbors(v) {
                if dist[w.index()] < 0 {
                    dist[w.index()] = dist[v.index()] + 1;
                    queue.push_back(w);
                }
                if dist[w.index()] == dist[v.index()] + 1 {
                    sigma[w.index()] += sigma[v.index()];
                    predecessors[w.index()].push(v);
                }
            }
        }

        // Back-propagation of pair dependencies.
        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w.index()] {
                let ratio = sigma[v.index()] / sigma[w.index()];
                delta[v.index()] += ratio * (1.0 + delta[w.index()]);
            }
            if w != s {
                cb[w.index()] += delta[w.index()];
            }
        }
    }

    let scale = 1.0 / (((n - 1) * (n - 2)) as f64);
    cb.into_iter().map(|v| v * scale).collect()
}

/// Closeness centrality from incoming-path distances.
///
/// For each node the BFS runs over reversed edges, so the distance measured
/// is "how far is everyone that depends on this node". Nodes nothing can
/// reach score 0.
pub fn closeness<N, E>(graph: &DiGraph<N, E>) -> Vec<f64> {
    let n = graph.node_count();
    let mut out = vec![0.0_f64; n];
    if n < 2 {
        return out;
    }

    for v in graph.node_indices() {
        let mut dist: Vec<i64> = vec![-1; n];
        dist[v.index()] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(v);
        let mut total = 0_i64;
        let mut reachable = 1_usize;

        while let Some(x) = queue.pop_front() {
            for u in graph.neighbors_directed(x, Direction::Incoming) {
                if dist[u.index()] < 0 {
                    dist[u.index()] = dist[x.index()] + 1;
                    total += dist[u.index()];
                    reachable += 1;
                    queue.push_back(u);
                }
            }
        }

        if total > 0 {
            let r = (reachable - 1) as f64;
            out[v.index()] = (r / total as f64) * (r / (n - 1) as f64);
        }
    }
    out
}
