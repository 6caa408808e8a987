use thiserror::Error;

/// Error taxonomy for the analysis pipeline.
///
/// Per-file parse failures and per-node centrality degeneracies never reach
/// this level; they are absorbed locally (file skipped, centrality zeroed).
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Request failed schema, file-path, or identifier validation.
    #[error("invalid request: {0}")]
    InputInvalid(String),

    /// No graph supplied and none stored for the repository and branch.
    #[error("no dependency graph for {repo_id}@{branch}")]
    GraphAbsent { repo_id: String, branch: String },

    /// Retrieval, planner, or store collaborator is down.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// Deadline expired between pipeline stages.
    #[error("cancelled")]
    Cancelled,

    /// Unexpected invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_display_is_wire_tag() {
        assert_eq!(AnalysisError::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn graph_absent_names_repo_and_branch() {
        let err = AnalysisError::GraphAbsent {
            repo_id: "svc".to_string(),
            branch: "main".to_string(),
        };
        assert_eq!(err.to_string(), "no dependency graph for svc@main");
    }
}
