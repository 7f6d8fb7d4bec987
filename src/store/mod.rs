//! Symbol index persistence layer over SQLite
//!
//! All writes go through [`SymbolStore`] on a single connection; extraction
//! runs in parallel elsewhere and hands finished module trees to this layer,
//! so no write transaction is ever held open across an external call.

mod auto_open;
mod modules;
mod packages;
pub mod query;
mod schema;
#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

// Re-export public types
pub use auto_open::BUILTIN_TYPES;
pub use modules::{flatten_module_trees, FileModules, FlatModule, StoredModule};
pub use query::{validate_query, QueryRejection, QueryRow, FORBIDDEN_SQL};

/// Busy timeout for `sync`, which owns the index for the whole pass
pub const SYNC_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Busy timeout for the post-build hook, which races concurrent compiler
/// invocations for the same index file
pub const UPDATE_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Row counts across the four content tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub packages: i64,
    pub modules: i64,
    pub types: i64,
    pub values: i64,
}

/// Handle on one symbol index database
///
/// Opening ensures the schema exists, switches the journal to WAL and turns
/// foreign-key enforcement on, so every cascade declared in the schema is
/// live for the lifetime of the connection.
pub struct SymbolStore {
    conn: Connection,
}

impl SymbolStore {
    /// Open or create the index at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Index file location (created if not exists)
    /// * `busy_timeout` - How long to wait on a locked database before failing
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open index at {}", db_path.display()))?;
        Self::configure(conn, busy_timeout)
    }

    /// Open a throwaway in-memory index, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, Duration::from_secs(1))
    }

    fn configure(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(schema::SCHEMA_DDL)?;
        Ok(Self { conn })
    }

    /// Count rows in each content table
    pub fn counts(&self) -> Result<IndexCounts> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };
        Ok(IndexCounts {
            packages: count("SELECT COUNT(*) FROM packages")?,
            modules: count("SELECT COUNT(*) FROM modules")?,
            types: count("SELECT COUNT(*) FROM types")?,
            values: count(r#"SELECT COUNT(*) FROM "values""#)?,
        })
    }
}

/// Paths are compared as text in the index, so every bind and lookup must
/// serialize them the same way.
fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
