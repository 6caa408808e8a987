//! Type definitions for impact analysis results.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Blast-radius classification of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Raw reachability result: the surviving seeds plus everything reachable
/// from them in either direction.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactSet {
    pub seeds: Vec<String>,
    pub impacted: BTreeSet<String>,
}

/// Scored and classified impact of a change set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    pub changed_files: Vec<String>,
    pub impacted_components: Vec<String>,
    pub impacted_count: usize,
    pub criticality_scores: BTreeMap<String, f64>,
    pub high_risk_areas: Vec<String>,
    pub risk_level: RiskLevel,
    pub affected_services: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Test plan attached to the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    pub unit_tests: Vec<String>,
    pub integration_tests: Vec<String>,
    pub smoke_tests: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_wire_form_is_uppercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
        let parsed: RiskLevel = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(parsed, RiskLevel::Low);
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }
}
