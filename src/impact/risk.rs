//! Risk classification and rule-based recommendations.

use crate::impact::types::RiskLevel;
use std::collections::{BTreeMap, BTreeSet};

/// Scores above this mark a component as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Components whose criticality exceeds the high-risk threshold, sorted.
pub fn high_risk_areas(scores: &BTreeMap<String, f64>) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, score)| **score > HIGH_RISK_THRESHOLD)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Risk band from the high-risk count and the maximum score. Conditions are
/// evaluated top to bottom; the first match wins.
pub fn classify(high_risk_count: usize, max_score: f64) -> RiskLevel {
    if high_risk_count >= 5 {
        RiskLevel::Critical
    } else if high_risk_count >= 3 || max_score > 0.85 {
        RiskLevel::High
    } else if high_risk_count >= 1 || max_score > 0.65 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Recommendation lines in their fixed emission order: risk band first, then
/// blast-radius scale, then changed-file keyword rules.
pub fn recommendations(
    risk_level: RiskLevel,
    impacted_count: usize,
    high_risk_count: usize,
    changed_files: &[String],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match risk_level {
        RiskLevel::Critical => {
            recommendations.push(
                "URGENT: Extensive impact detected. Recommend staged rollout with feature flags"
                    .to_string(),
            );
            recommendations.push("Implement enhanced monitoring and alerting".to_string());
            recommendations.push("Consider rolling back plan if issues detected".to_string());
        }
        RiskLevel::High => {
            recommendations.push("High impact detected. Plan comprehensive testing".to_string());
            recommendations
                .push("Deploy with caution, monitor all affected endpoints".to_string());
        }
        RiskLevel::Medium => {
            recommendations.push("Standard testing procedures recommended".to_string());
        }
        RiskLevel::Low => {}
    }

    if impacted_count > 20 {
        recommendations.push(format!(
            "Large blast radius ({impacted_count} components). Execute thorough integration tests"
        ));
    }

    if high_risk_count > 0 {
        recommendations.push(format!(
            "Focus testing on {high_risk_count} high-criticality components"
        ));
    }

    let lowered: Vec<String> = changed_files.iter().map(|f| f.to_lowercase()).collect();
    if lowered.iter().any(|f| f.contains("database")) {
        recommendations
            .push("Database schema changes detected. Verify migration strategy".to_string());
    }
    if lowered.iter().any(|f| f.contains("api")) {
        recommendations.push("API changes detected. Verify backward compatibility".to_string());
    }
    if lowered
        .iter()
        .any(|f| f.contains("auth") || f.contains("security"))
    {
        recommendations.push("Security-related changes. Perform security review".to_string());
    }

    recommendations
}

/// Service names touched by the impacted set: the second path segment of any
/// component under `services/`, sorted.
pub fn affected_services<'a>(components: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut services = BTreeSet::new();
    for component in components {
        let mut parts = component.split('/');
        if parts.next() == Some("services") {
            if let Some(service) = parts.next() {
                services.insert(service.to_string());
            }
        }
    }
    services.into_iter().collect()
}
