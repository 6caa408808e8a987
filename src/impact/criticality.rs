//! Criticality scoring for impacted nodes.
//!
//! The score blends normalized degree with the precomputed centralities:
//! components many modules depend on weigh most, bridges next, proximity
//! least.

use crate::graph::DepGraph;
use crate::impact::types::ImpactSet;
use std::collections::{BTreeMap, BTreeSet};

const W_IN_DEGREE: f64 = 0.4;
const W_OUT_DEGREE: f64 = 0.2;
const W_BETWEENNESS: f64 = 0.3;
const W_CLOSENESS: f64 = 0.1;

/// Score reported when a node cannot be evaluated.
const FALLBACK_SCORE: f64 = 0.5;

/// Criticality of a single node in `[0, 1]`.
pub fn score(id: &str, graph: &DepGraph) -> f64 {
    score_with_max_degree(id, graph, graph.max_degree() as f64)
}

/// Score every impacted node except the seeds themselves: the changed files
/// are the cause of the impact, not part of it.
pub fn score_impacted(set: &ImpactSet, graph: &DepGraph) -> BTreeMap<String, f64> {
    let seeds: BTreeSet<&str> = set.seeds.iter().map(String::as_str).collect();
    let max_degree = graph.max_degree() as f64;
    set.impacted
        .iter()
        .filter(|id| !seeds.contains(id.as_str()))
        .map(|id| (id.clone(), score_with_max_degree(id, graph, max_degree)))
        .collect()
}

fn score_with_max_degree(id: &str, graph: &DepGraph, max_degree: f64) -> f64 {
    let Some(node) = graph.node(id) else {
        return FALLBACK_SCORE;
    };
    let in_n = graph.in_degree(id) as f64 / max_degree;
    let out_n = graph.out_degree(id) as f64 / max_degree;
    let score = in_n * W_IN_DEGREE
        + out_n * W_OUT_DEGREE
        + node.centrality.betweenness * W_BETWEENNESS
        + node.centrality.closeness * W_CLOSENESS;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph;
    use crate::impact;
    use crate::model::{ImportKind, ImportRef, Language, ParseResult, ParseResults};

    fn hub_graph() -> crate::graph::DepGraph {
        // n1..n5 all import hub.py
        let mut results = ParseResults::new();
        for i in 1..=5 {
            let mut result = ParseResult::empty(Language::Python);
            result.imports.push(ImportRef {
                name: "hub".to_string(),
                alias: None,
                module: None,
                kind: ImportKind::Plain,
            });
            results.insert(format!("n{i}.py"), result);
        }
        results.insert("hub.py".to_string(), ParseResult::empty(Language::Python));
        graph::build(&results)
    }

    #[test]
    fn hub_outranks_leaves() {
        let graph = hub_graph();
        let hub = score("hub.py", &graph);
        let leaf = score("n2.py", &graph);
        assert!(hub > leaf, "hub {hub} should beat leaf {leaf}");
        assert!((0.0..=1.0).contains(&hub));
    }

    #[test]
    fn missing_node_defaults_to_half() {
        let graph = hub_graph();
        assert_eq!(score("nowhere.py", &graph), 0.5);
    }

    #[test]
    fn seeds_are_never_scored() {
        let graph = hub_graph();
        let changed = vec!["n1.py".to_string()];
        let set = impact::analyze(&changed, &graph);
        let scores = score_impacted(&set, &graph);
        assert!(!scores.contains_key("n1.py"));
        assert!(scores.contains_key("hub.py"));
    }

    #[test]
    fn scores_bounded() {
        let graph = hub_graph();
        let changed = vec!["n1.py".to_string()];
        let set = impact::analyze(&changed, &graph);
        for (_, value) in score_impacted(&set, &graph) {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
