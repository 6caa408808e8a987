//! Analysis request and response shapes, with request validation.

use crate::error::AnalysisError;
use crate::graph::codec::NodeLinkDocument;
use crate::impact::types::{ImpactAnalysis, TestPlan};
use crate::model::ValidationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_DESCRIPTION_CHARS: usize = 1000;
const MAX_AFFECTED_FILES: usize = 100;
const FORBIDDEN_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub change_description: String,
    #[serde(default)]
    pub affected_files: Vec<String>,
    pub repo_id: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_graph: Option<NodeLinkDocument>,
}

impl AnalysisRequest {
    /// Validate field constraints, collecting every violation before failing.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let mut result = ValidationResult::new();

        if self.change_description.is_empty() {
            result.add("change_description", "empty", "must not be empty");
        } else if self.change_description.chars().count() > MAX_DESCRIPTION_CHARS {
            result.add(
                "change_description",
                "too_long",
                &format!("must be at most {MAX_DESCRIPTION_CHARS} characters"),
            );
        }

        if self.affected_files.len() > MAX_AFFECTED_FILES {
            result.add(
                "affected_files",
                "too_many",
                &format!("must list at most {MAX_AFFECTED_FILES} files"),
            );
        }
        for file in &self.affected_files {
            if file.contains("..") {
                result.add(
                    "affected_files",
                    "traversal",
                    &format!("'{file}' must not contain '..'"),
                );
            }
            if file.starts_with('/') {
                result.add(
                    "affected_files",
                    "absolute",
                    &format!("'{file}' must be repository-relative"),
                );
            }
            if file.contains(FORBIDDEN_PATH_CHARS) {
                result.add(
                    "affected_files",
                    "forbidden_chars",
                    &format!("'{file}' contains a forbidden character"),
                );
            }
        }

        if self.repo_id.is_empty()
            || !self
                .repo_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            result.add(
                "repo_id",
                "invalid",
                "must match [A-Za-z0-9_-]+ and not be empty",
            );
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(AnalysisError::InputInvalid(result.summary()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Failed,
    Processing,
}

/// Echo of the whole analysis, nested inside the response.
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub repo_id: String,
    pub branch: String,
    pub change_description: String,
    pub timestamp: String,
    pub impact_analysis: ImpactAnalysis,
    pub criticality_scores: BTreeMap<String, f64>,
    pub test_plan: TestPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_plan: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    pub timestamp: String,
    pub repo_id: String,
    pub branch: String,
    pub change_description: String,
    pub impact_analysis: ImpactAnalysis,
    pub criticality_scores: BTreeMap<String, f64>,
    pub test_plan: TestPlan,
    pub final_report: FinalReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
