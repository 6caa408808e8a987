//! Impact engine: what else is touched when a set of files changes?
//!
//! Reachability runs over the frozen dependency graph in both directions:
//! descendants are what the changed files pull in, ancestors are what pulls
//! the changed files in. Criticality and risk are layered on top of the raw
//! impacted set.

pub mod criticality;
pub mod risk;
pub mod types;

pub use types::{ImpactAnalysis, ImpactSet, RiskLevel, TestPlan};

use crate::graph::DepGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Compute the impacted set for a changed-file set.
///
/// Changed files absent from the graph are silently dropped from the seed;
/// they contribute nothing.
pub fn analyze(changed_files: &[String], graph: &DepGraph) -> ImpactSet {
    let seeds: Vec<String> = changed_files
        .iter()
        .filter(|file| graph.contains(file))
        .cloned()
        .collect();

    let mut impacted: BTreeSet<String> = seeds.iter().cloned().collect();
    for seed in &seeds {
        impacted.extend(graph.descendants(seed));
        impacted.extend(graph.ancestors(seed));
    }

    ImpactSet { seeds, impacted }
}

/// Full assessment: reachability, criticality, risk band, recommendations.
///
/// Without a graph the impacted set degrades to the changed files themselves,
/// scores stay empty, and the risk is LOW; the keyword recommendation rules
/// still apply.
pub fn assess(changed_files: &[String], graph: Option<&DepGraph>) -> ImpactAnalysis {
    match graph {
        Some(graph) => {
            let set = analyze(changed_files, graph);
            score_set(changed_files, &set, graph)
        }
        None => without_graph(changed_files),
    }
}

/// Score and classify a precomputed impacted set.
pub fn score_set(changed_files: &[String], set: &ImpactSet, graph: &DepGraph) -> ImpactAnalysis {
    let scores = criticality::score_impacted(set, graph);
    finish(changed_files, set.impacted.clone(), scores)
}

/// Degraded assessment when no graph is available.
pub fn without_graph(changed_files: &[String]) -> ImpactAnalysis {
    finish(
        changed_files,
        changed_files.iter().cloned().collect(),
        BTreeMap::new(),
    )
}

fn finish(
    changed_files: &[String],
    impacted: BTreeSet<String>,
    scores: BTreeMap<String, f64>,
) -> ImpactAnalysis {
    let high_risk_areas = risk::high_risk_areas(&scores);
    let max_score = scores.values().copied().fold(0.0_f64, f64::max);
    let risk_level = risk::classify(high_risk_areas.len(), max_score);
    let recommendations = risk::recommendations(
        risk_level,
        impacted.len(),
        high_risk_areas.len(),
        changed_files,
    );
    let affected_services = risk::affected_services(impacted.iter());

    ImpactAnalysis {
        changed_files: changed_files.to_vec(),
        impacted_count: impacted.len(),
        impacted_components: impacted.into_iter().collect(),
        criticality_scores: scores,
        high_risk_areas,
        risk_level,
        affected_services,
        recommendations,
    }
}
