use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ripple",
    version,
    about = "Change impact analyzer",
    after_help = r#"Examples:
  ripple scan --repo . --repo-id shop-backend
  ripple scan --repo . --repo-id shop-backend --dry-run
  ripple analyze --request '{"change_description":"refactor checkout","affected_files":["services/payment/api.py"],"repo_id":"shop-backend"}'
  ripple analyze --request-file request.json
  ripple graph --repo-id shop-backend --branch main
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan a repository, build its dependency graph, and store it.
    Scan {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Repository identifier the graph is stored under.
        #[arg(long)]
        repo_id: String,
        #[arg(long, default_value = "main")]
        branch: String,
        /// Print the encoded document instead of persisting it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a change-impact analysis for a request.
    Analyze {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Request JSON, inline.
        #[arg(long, default_value = "{}")]
        request: String,
        /// Read the request JSON from a file instead.
        #[arg(long, value_name = "PATH")]
        request_file: Option<PathBuf>,
    },
    /// Print the stored dependency graph for a repository and branch.
    Graph {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        repo_id: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
}
