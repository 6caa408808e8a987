use anyhow::Result;
use clap::Parser;
use ripple::{cli, config, error, graph, orchestrator, parser, request, store, util};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn default_db_path(repo: &Path) -> PathBuf {
    repo.join(".ripple").join("ripple.sqlite")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Scan {
            repo,
            db,
            repo_id,
            branch,
            dry_run,
        } => {
            let mut artifact_parser = parser::ArtifactParser::new()?;
            let results = artifact_parser.parse_directory(&repo)?;
            let built = graph::build(&results);
            let document = graph::codec::encode(&built, &repo_id, &branch);
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                let db_path = db.unwrap_or_else(|| default_db_path(&repo));
                let graph_store = store::GraphStore::new(&db_path)?;
                let graph_id = graph_store.put(&document)?;
                let summary = json!({
                    "graph_id": graph_id,
                    "repo_id": document.repo_id,
                    "branch": document.branch,
                    "nodes_count": document.nodes_count,
                    "edges_count": document.edges_count,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(())
        }
        cli::Command::Analyze {
            repo,
            db,
            request: request_raw,
            request_file,
        } => {
            let raw = if let Some(path) = request_file {
                util::read_to_string(&path)?
            } else {
                request_raw
            };
            let analysis_request: request::AnalysisRequest = serde_json::from_str(&raw)?;

            // Inline node-link graphs win; otherwise fall back to the store.
            let resolved = match &analysis_request.dependency_graph {
                Some(document) => Some(graph::codec::from_node_link(document)),
                None => {
                    let db_path = db.unwrap_or_else(|| default_db_path(&repo));
                    match store::GraphStore::new(&db_path) {
                        Ok(graph_store) => graph_store
                            .get(&analysis_request.repo_id, &analysis_request.branch)?
                            .map(|document| graph::codec::decode(&document)),
                        Err(err) => {
                            tracing::warn!(%err, "graph store unavailable, analyzing without graph");
                            None
                        }
                    }
                }
            };

            let deadline = Instant::now()
                + Duration::from_secs(config::Config::get().analysis_timeout_secs);
            let response = orchestrator::Orchestrator::new().run(
                &analysis_request,
                resolved.as_ref(),
                Some(deadline),
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        cli::Command::Graph {
            repo,
            db,
            repo_id,
            branch,
        } => {
            let db_path = db.unwrap_or_else(|| default_db_path(&repo));
            let graph_store = store::GraphStore::new(&db_path)?;
            match graph_store.get(&repo_id, &branch)? {
                Some(document) => {
                    println!("{}", serde_json::to_string_pretty(&document)?);
                    Ok(())
                }
                None => Err(error::AnalysisError::GraphAbsent { repo_id, branch }.into()),
            }
        }
    }
}
