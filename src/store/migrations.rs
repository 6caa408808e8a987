use anyhow::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS graph_documents (
            id INTEGER PRIMARY KEY,
            graph_id TEXT NOT NULL UNIQUE,
            repo_id TEXT NOT NULL,
            branch TEXT NOT NULL,
            created_at TEXT NOT NULL,
            nodes_count INTEGER NOT NULL,
            edges_count INTEGER NOT NULL,
            document TEXT NOT NULL,
            superseded INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_graph_documents_repo_branch
            ON graph_documents(repo_id, branch, superseded);

        COMMIT;
        ",
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
