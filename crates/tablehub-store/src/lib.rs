// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tablehub_app::{SnapshotStore, ViewId, ViewPath, ViewSnapshot};

pub const APP_NAME: &str = "tablehub";

/// Row key of the one-shot handoff. View paths always start with `/`, so it
/// cannot collide with a path-keyed snapshot.
pub const HANDOFF_KEY: &str = "last";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS view_state (
  key TEXT PRIMARY KEY,
  snapshot TEXT NOT NULL,
  updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[("view_state", &["key", "snapshot", "updated_at"])];

/// Session-scoped view state on disk: one JSON snapshot per view path plus
/// the handoff row.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open session database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn.execute_batch(SCHEMA).context("create schema")?;
        }
        Ok(())
    }

    /// Paths with a saved snapshot, in key order. The handoff row is not a
    /// path and is left out.
    pub fn snapshot_paths(&self) -> Result<Vec<ViewPath>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM view_state WHERE key <> ? ORDER BY key")
            .context("prepare snapshot listing")?;
        let rows = stmt
            .query_map(params![HANDOFF_KEY], |row| row.get::<_, String>(0))
            .context("list snapshot paths")?;
        rows.map(|key| {
            key.map(|key| ViewId::new(key.trim_start_matches('/')).path())
                .context("decode snapshot path")
        })
        .collect()
    }

    pub fn delete_snapshot(&self, path: &ViewPath) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM view_state WHERE key = ?", params![path.as_str()])
            .with_context(|| format!("delete snapshot for {path}"))?;
        Ok(removed > 0)
    }

    /// Drops every snapshot and any pending handoff. Returns the number of
    /// rows removed.
    pub fn clear_snapshots(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM view_state", [])
            .context("clear view state")?;
        tracing::info!(removed, "cleared saved view state");
        Ok(removed)
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT snapshot FROM view_state WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read view state for {key}"))
    }

    fn write(&self, key: &str, snapshot: &ViewSnapshot) -> Result<()> {
        let raw = snapshot
            .to_json()
            .with_context(|| format!("encode view state for {key}"))?;
        self.conn
            .execute(
                "
                INSERT INTO view_state (key, snapshot, updated_at)
                VALUES (?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(key) DO UPDATE SET
                  snapshot = excluded.snapshot,
                  updated_at = excluded.updated_at
                ",
                params![key, raw],
            )
            .with_context(|| format!("write view state for {key}"))?;
        Ok(())
    }
}

impl SnapshotStore for Store {
    fn load_snapshot(&self, path: &ViewPath) -> Result<Option<ViewSnapshot>> {
        Ok(self
            .read(path.as_str())?
            .and_then(|raw| decode_snapshot(path.as_str(), &raw)))
    }

    fn save_snapshot(&mut self, path: &ViewPath, snapshot: &ViewSnapshot) -> Result<()> {
        self.write(path.as_str(), snapshot)
    }

    fn put_handoff(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
        self.write(HANDOFF_KEY, snapshot)
    }

    fn take_handoff(&mut self) -> Result<Option<ViewSnapshot>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "DELETE FROM view_state WHERE key = ? RETURNING snapshot",
                params![HANDOFF_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("take view state handoff")?;
        Ok(raw.and_then(|raw| decode_snapshot(HANDOFF_KEY, &raw)))
    }
}

/// Unreadable rows count as absent; a stale snapshot must never keep a view
/// from loading.
fn decode_snapshot(key: &str, raw: &str) -> Option<ViewSnapshot> {
    match ViewSnapshot::from_json(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            tracing::warn!(key, %error, "ignoring unreadable view state");
            None
        }
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("TABLEHUB_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TABLEHUB_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("session.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point storage.db_path at a tablehub session file"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; delete the session file to start fresh",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("read column info for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

#[cfg(test)]
mod tests {
    use super::{HANDOFF_KEY, Store, decode_snapshot};
    use anyhow::Result;

    #[test]
    fn bootstrap_is_idempotent() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.bootstrap()?;
        assert!(store.snapshot_paths()?.is_empty());
        Ok(())
    }

    #[test]
    fn garbage_snapshot_decodes_to_none() {
        assert_eq!(decode_snapshot(HANDOFF_KEY, "{not json"), None);
        assert_eq!(decode_snapshot(HANDOFF_KEY, "[]"), None);
    }

    #[test]
    fn minimal_snapshot_fills_defaults() {
        let snapshot = decode_snapshot("/v", r#"{"row":3,"col":1}"#);
        assert_eq!(snapshot.map(|s| (s.row, s.col, s.hidden_columns.len())), Some((3, 1, 0)));
    }
}
