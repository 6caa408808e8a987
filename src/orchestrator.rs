//! Analysis pipeline orchestrator.
//!
//! Runs one request through a fixed stage sequence: planning, then
//! dependency analysis and context retrieval side by side, then scoring,
//! test planning, and report assembly. Dependency analysis and retrieval are
//! forked onto scoped threads and joined before scoring starts, so retrieval
//! latency never delays nor perturbs the numeric pipeline.
//!
//! The deadline is checked between stages only; CPU kernels are never
//! preempted mid-call. Collaborator failures degrade to their empty
//! contribution and set the `error` field while the status stays
//! `completed`; cancellation fails the analysis with a partial result.

use crate::config::Config;
use crate::graph::DepGraph;
use crate::impact::{self, ImpactAnalysis, ImpactSet, TestPlan};
use crate::request::{AnalysisRequest, AnalysisResponse, AnalysisStatus, FinalReport};
use crate::retrieval::{ContextDocument, ContextRetriever, QueryPlanner};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use uuid::Uuid;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Analyzing,
    Retrieving,
    Scoring,
    PlanningTests,
    Reporting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Analyzing => "analyzing",
            Stage::Retrieving => "retrieving",
            Stage::Scoring => "scoring",
            Stage::PlanningTests => "planning_tests",
            Stage::Reporting => "reporting",
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = stage.as_str(), "entering stage");
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Rule-based test plan used whenever no planner is available or its output
/// is unusable.
pub fn heuristic_test_plan(impacted_count: usize) -> TestPlan {
    TestPlan {
        unit_tests: (0..impacted_count.min(5))
            .map(|i| format!("test_affected_component_{i}"))
            .collect(),
        integration_tests: vec!["integration_test_main_flow".to_string()],
        smoke_tests: vec!["smoke_test_critical_paths".to_string()],
    }
}

#[derive(Default)]
pub struct Orchestrator {
    planner: Option<Arc<dyn QueryPlanner>>,
    retriever: Option<Arc<dyn ContextRetriever>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_planner(mut self, planner: Arc<dyn QueryPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Run one analysis to completion. Never panics outward: every failure
    /// mode is folded into the response status and error field.
    pub fn run(
        &self,
        request: &AnalysisRequest,
        graph: Option<&DepGraph>,
        deadline: Option<Instant>,
    ) -> AnalysisResponse {
        let analysis_id = format!(
            "analysis_{}_{}",
            request.repo_id,
            Uuid::new_v4().simple()
        );
        tracing::info!(
            %analysis_id,
            repo_id = %request.repo_id,
            files = request.affected_files.len(),
            "starting impact analysis"
        );

        if let Err(err) = request.validate() {
            return respond(
                request,
                &analysis_id,
                impact::without_graph(&[]),
                heuristic_test_plan(0),
                None,
                Some(err.to_string()),
                AnalysisStatus::Failed,
            );
        }

        let mut error: Option<String> = None;
        let mut failed = false;

        enter(Stage::Planning);
        let query_plan = self.plan_queries(request, &mut error);

        if deadline_expired(deadline) {
            return cancelled(request, &analysis_id, None, query_plan);
        }

        // Fork-join: dependency analysis and context retrieval in parallel.
        let retriever = self.retriever.clone();
        let (dep_result, ctx_result) = thread::scope(|scope| {
            let dep_handle = scope.spawn(|| {
                enter(Stage::Analyzing);
                graph.map(|g| impact::analyze(&request.affected_files, g))
            });
            let ctx_handle = scope.spawn(|| {
                enter(Stage::Retrieving);
                match &retriever {
                    Some(r) => r
                        .retrieve(&retrieval_query(request), Config::get().retrieval_k)
                        .map(Some),
                    None => Ok(None),
                }
            });
            (dep_handle.join(), ctx_handle.join())
        });

        let impact_set: Option<ImpactSet> = match dep_result {
            Ok(set) => set,
            Err(_) => {
                error = Some("internal error: dependency analysis panicked".to_string());
                failed = true;
                None
            }
        };
        let context: Vec<ContextDocument> = match ctx_result {
            Ok(Ok(Some(documents))) => documents,
            Ok(Ok(None)) => Vec::new(),
            Ok(Err(err)) => {
                tracing::warn!(%err, "context retrieval failed, continuing without context");
                error.get_or_insert(format!("context retrieval failed: {err}"));
                Vec::new()
            }
            Err(_) => {
                error.get_or_insert("internal error: retrieval panicked".to_string());
                Vec::new()
            }
        };
        tracing::debug!(retrieved = context.len(), "context retrieval joined");

        if deadline_expired(deadline) {
            return cancelled(request, &analysis_id, impact_set.as_ref(), query_plan);
        }

        enter(Stage::Scoring);
        let analysis = match (&impact_set, graph) {
            (Some(set), Some(g)) => impact::score_set(&request.affected_files, set, g),
            _ => {
                if graph.is_none() {
                    tracing::info!("no dependency graph available, degrading to changed files");
                }
                impact::without_graph(&request.affected_files)
            }
        };

        if deadline_expired(deadline) {
            return cancelled(request, &analysis_id, impact_set.as_ref(), query_plan);
        }

        enter(Stage::PlanningTests);
        let test_plan = self.plan_tests(request, &analysis, &mut error);

        enter(Stage::Reporting);
        let status = if failed {
            AnalysisStatus::Failed
        } else {
            AnalysisStatus::Completed
        };
        tracing::info!(
            %analysis_id,
            impacted = analysis.impacted_count,
            risk = ?analysis.risk_level,
            "impact analysis finished"
        );
        respond(
            request,
            &analysis_id,
            analysis,
            test_plan,
            query_plan,
            error,
            status,
        )
    }

    /// Advisory query planning. Failure sets the error field but never stops
    /// the analysis.
    fn plan_queries(
        &self,
        request: &AnalysisRequest,
        error: &mut Option<String>,
    ) -> Option<serde_json::Value> {
        let planner = self.planner.as_ref()?;
        match planner.invoke(&planning_prompt(request)) {
            Ok(text) => Some(
                serde_json::from_str(&text)
                    .unwrap_or_else(|_| serde_json::json!({ "raw_response": text })),
            ),
            Err(err) => {
                tracing::warn!(%err, "query planning failed, continuing without plan");
                error.get_or_insert(format!("query planning failed: {err}"));
                None
            }
        }
    }

    /// Test plan from the planner when possible, heuristic stubs otherwise.
    fn plan_tests(
        &self,
        request: &AnalysisRequest,
        analysis: &ImpactAnalysis,
        error: &mut Option<String>,
    ) -> TestPlan {
        let fallback = heuristic_test_plan(analysis.impacted_count);
        let Some(planner) = self.planner.as_ref() else {
            return fallback;
        };
        match planner.invoke(&test_plan_prompt(request, analysis)) {
            Ok(text) => serde_json::from_str(&text).unwrap_or(fallback),
            Err(err) => {
                tracing::warn!(%err, "test planning failed, using heuristic plan");
                error.get_or_insert(format!("test planning failed: {err}"));
                fallback
            }
        }
    }
}

fn planning_prompt(request: &AnalysisRequest) -> String {
    format!(
        "Analyze this code change and identify what needs to be analyzed:\n\n\
         Change: {}\n\n\
         Provide a JSON response with:\n\
         1. key_areas: List of code areas affected\n\
         2. analysis_priorities: Priority levels (HIGH/MEDIUM/LOW)\n\
         3. testing_requirements: What needs to be tested\n\
         4. risks: Identified risks",
        request.change_description
    )
}

fn test_plan_prompt(request: &AnalysisRequest, analysis: &ImpactAnalysis) -> String {
    let description: String = request.change_description.chars().take(500).collect();
    format!(
        "Generate a test plan for this code change:\n\n\
         Affected Components: {}\n\
         Change: {description}\n\n\
         Provide test recommendations as JSON with unit_tests, \
         integration_tests and smoke_tests arrays",
        analysis.impacted_count
    )
}

fn retrieval_query(request: &AnalysisRequest) -> String {
    let files: Vec<&str> = request
        .affected_files
        .iter()
        .take(5)
        .map(String::as_str)
        .collect();
    format!("{} {}", request.change_description, files.join(" "))
}

/// Cancellation between stages: partial numbers if dependency analysis
/// already completed, degraded ones otherwise.
fn cancelled(
    request: &AnalysisRequest,
    analysis_id: &str,
    impact_set: Option<&ImpactSet>,
    query_plan: Option<serde_json::Value>,
) -> AnalysisResponse {
    tracing::warn!(analysis_id, "analysis cancelled at deadline");
    let analysis = match impact_set {
        Some(set) => partial_analysis(&request.affected_files, set),
        None => impact::without_graph(&request.affected_files),
    };
    respond(
        request,
        analysis_id,
        analysis,
        heuristic_test_plan(0),
        query_plan,
        Some("cancelled".to_string()),
        AnalysisStatus::Failed,
    )
}

/// Impact numbers for a reachability set whose scoring never ran.
fn partial_analysis(changed_files: &[String], set: &ImpactSet) -> ImpactAnalysis {
    ImpactAnalysis {
        changed_files: changed_files.to_vec(),
        impacted_components: set.impacted.iter().cloned().collect(),
        impacted_count: set.impacted.len(),
        criticality_scores: Default::default(),
        high_risk_areas: Vec::new(),
        risk_level: impact::RiskLevel::Low,
        affected_services: crate::impact::risk::affected_services(set.impacted.iter()),
        recommendations: Vec::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn respond(
    request: &AnalysisRequest,
    analysis_id: &str,
    analysis: ImpactAnalysis,
    test_plan: TestPlan,
    query_plan: Option<serde_json::Value>,
    error: Option<String>,
    status: AnalysisStatus,
) -> AnalysisResponse {
    let timestamp = now_rfc3339();
    let final_report = FinalReport {
        repo_id: request.repo_id.clone(),
        branch: request.branch.clone(),
        change_description: request.change_description.clone(),
        timestamp: timestamp.clone(),
        impact_analysis: analysis.clone(),
        criticality_scores: analysis.criticality_scores.clone(),
        test_plan: test_plan.clone(),
        query_plan,
        error: error.clone(),
    };
    AnalysisResponse {
        analysis_id: analysis_id.to_string(),
        status,
        timestamp,
        repo_id: request.repo_id.clone(),
        branch: request.branch.clone(),
        change_description: request.change_description.clone(),
        criticality_scores: analysis.criticality_scores.clone(),
        impact_analysis: analysis,
        test_plan,
        final_report,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::graph;
    use crate::model::{ImportKind, ImportRef, Language, ParseResult, ParseResults};
    use crate::retrieval::LexicalRetriever;
    use std::collections::BTreeMap;

    struct EchoPlanner;

    impl QueryPlanner for EchoPlanner {
        fn invoke(&self, _prompt: &str) -> Result<String, AnalysisError> {
            Ok("{\"key_areas\": [\"payment\"]}".to_string())
        }
    }

    struct DownPlanner;

    impl QueryPlanner for DownPlanner {
        fn invoke(&self, _prompt: &str) -> Result<String, AnalysisError> {
            Err(AnalysisError::CollaboratorUnavailable("planner".to_string()))
        }
    }

    fn chain_graph() -> DepGraph {
        let mut results = ParseResults::new();
        let mut a = ParseResult::empty(Language::Python);
        a.imports.push(ImportRef {
            name: "b".to_string(),
            alias: None,
            module: None,
            kind: ImportKind::Plain,
        });
        results.insert("a.py".to_string(), a);
        results.insert("b.py".to_string(), ParseResult::empty(Language::Python));
        graph::build(&results)
    }

    fn request(files: &[&str]) -> AnalysisRequest {
        AnalysisRequest {
            change_description: "touch payment handler".to_string(),
            affected_files: files.iter().map(|f| f.to_string()).collect(),
            repo_id: "repo-1".to_string(),
            branch: "main".to_string(),
            dependency_graph: None,
        }
    }

    #[test]
    fn completes_with_graph() {
        let graph = chain_graph();
        let response = Orchestrator::new().run(&request(&["a.py"]), Some(&graph), None);
        assert_eq!(response.status, AnalysisStatus::Completed);
        assert_eq!(
            response.impact_analysis.impacted_components,
            vec!["a.py".to_string(), "b.py".to_string()]
        );
        assert!(response.error.is_none());
        assert_eq!(response.final_report.impact_analysis.impacted_count, 2);
    }

    #[test]
    fn missing_graph_degrades_to_changed_files() {
        let response = Orchestrator::new().run(&request(&["x.py"]), None, None);
        assert_eq!(response.status, AnalysisStatus::Completed);
        assert_eq!(
            response.impact_analysis.impacted_components,
            vec!["x.py".to_string()]
        );
        assert!(response.criticality_scores.is_empty());
        assert_eq!(response.impact_analysis.risk_level, impact::RiskLevel::Low);
    }

    #[test]
    fn invalid_request_fails_fast() {
        let mut bad = request(&["a.py"]);
        bad.repo_id = "no spaces allowed".to_string();
        let response = Orchestrator::new().run(&bad, None, None);
        assert_eq!(response.status, AnalysisStatus::Failed);
        assert!(response.error.unwrap().contains("repo_id"));
    }

    #[test]
    fn expired_deadline_cancels() {
        let graph = chain_graph();
        let deadline = Instant::now();
        let response = Orchestrator::new().run(&request(&["a.py"]), Some(&graph), Some(deadline));
        assert_eq!(response.status, AnalysisStatus::Failed);
        assert_eq!(response.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn planner_outage_keeps_status_completed() {
        let graph = chain_graph();
        let orchestrator = Orchestrator::new().with_planner(Arc::new(DownPlanner));
        let response = orchestrator.run(&request(&["a.py"]), Some(&graph), None);
        assert_eq!(response.status, AnalysisStatus::Completed);
        assert!(response.error.unwrap().contains("planning failed"));
        // Heuristic plan took over.
        assert_eq!(response.test_plan.unit_tests.len(), 2);
    }

    #[test]
    fn planner_output_lands_in_report() {
        let graph = chain_graph();
        let orchestrator = Orchestrator::new().with_planner(Arc::new(EchoPlanner));
        let response = orchestrator.run(&request(&["a.py"]), Some(&graph), None);
        let plan = response.final_report.query_plan.unwrap();
        assert_eq!(plan["key_areas"][0], "payment");
    }

    #[test]
    fn retrieval_never_changes_scores() {
        let graph = chain_graph();
        let mut retriever = LexicalRetriever::new();
        retriever.index_document("payment handler notes", BTreeMap::new());
        let with = Orchestrator::new()
            .with_retriever(Arc::new(retriever))
            .run(&request(&["a.py"]), Some(&graph), None);
        let without = Orchestrator::new().run(&request(&["a.py"]), Some(&graph), None);
        assert_eq!(with.criticality_scores, without.criticality_scores);
        assert_eq!(
            with.impact_analysis.risk_level,
            without.impact_analysis.risk_level
        );
    }

    #[test]
    fn heuristic_plan_caps_unit_stubs() {
        let plan = heuristic_test_plan(12);
        assert_eq!(plan.unit_tests.len(), 5);
        assert_eq!(plan.unit_tests[0], "test_affected_component_0");
        assert_eq!(plan.integration_tests, vec!["integration_test_main_flow"]);
        assert_eq!(plan.smoke_tests, vec!["smoke_test_critical_paths"]);
    }
}
