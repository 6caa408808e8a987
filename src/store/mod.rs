//! SQLite-backed graph store.
//!
//! Holds encoded graph documents per `(repo_id, branch)`. A new `put`
//! supersedes older rows for the same pair instead of mutating them, so a
//! reader holding an old graph keeps a consistent view.

use crate::config::Config;
use crate::graph::codec::GraphDocument;
use crate::util;
use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod migrations;

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}

pub struct GraphStore {
    db_path: PathBuf,
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Pool<SqliteConnectionManager>,
}

impl GraphStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        util::ensure_parent_dir(db_path)?;

        let config = Config::get();

        let write_conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db at {}", db_path.display()))?;
        write_conn.busy_timeout(Duration::from_secs(30))?;
        write_conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        migrations::migrate(&write_conn)?;

        let write_conn = Arc::new(Mutex::new(write_conn));

        let manager = SqliteConnectionManager::file(db_path);
        let read_pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_min_idle))
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .with_context(|| "create connection pool")?;

        tracing::debug!(path = %db_path.display(), "graph store opened");

        Ok(Self {
            db_path: db_path.to_path_buf(),
            write_conn,
            read_pool,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.write_conn
            .lock()
            .map_err(|_| anyhow::anyhow!("graph store write lock poisoned"))
    }

    fn read_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.read_pool
            .get()
            .with_context(|| "get read connection from pool")
    }

    /// Persist a document, superseding earlier ones for the same repo and
    /// branch. Returns the stored graph id.
    pub fn put(&self, document: &GraphDocument) -> Result<String> {
        let payload = serde_json::to_string(document)?;
        let conn = self.conn()?;
        conn.execute(
            "UPDATE graph_documents SET superseded = 1
             WHERE repo_id = ?1 AND branch = ?2 AND superseded = 0",
            params![document.repo_id, document.branch],
        )?;
        conn.execute(
            "INSERT INTO graph_documents
             (graph_id, repo_id, branch, created_at, nodes_count, edges_count, document)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                document.graph_id,
                document.repo_id,
                document.branch,
                document.created_at,
                document.nodes_count as i64,
                document.edges_count as i64,
                payload,
            ],
        )?;
        tracing::info!(
            graph_id = %document.graph_id,
            repo_id = %document.repo_id,
            branch = %document.branch,
            "stored graph document"
        );
        Ok(document.graph_id.clone())
    }

    /// Latest live document for a repo and branch, if any.
    pub fn get(&self, repo_id: &str, branch: &str) -> Result<Option<GraphDocument>> {
        let conn = self.read_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT document FROM graph_documents
                 WHERE repo_id = ?1 AND branch = ?2 AND superseded = 0
                 ORDER BY id DESC LIMIT 1",
                params![repo_id, branch],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => {
                let document = serde_json::from_str(&payload)
                    .with_context(|| format!("decode stored graph for {repo_id}@{branch}"))?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    /// Number of live (non-superseded) documents.
    pub fn live_count(&self) -> Result<i64> {
        let conn = self.read_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM graph_documents WHERE superseded = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
