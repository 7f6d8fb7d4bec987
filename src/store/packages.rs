//! Package rows: one per resolved package, keyed by unique name

use std::path::Path;

use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{path_text, SymbolStore};

impl SymbolStore {
    /// Insert or refresh a package row and return its id
    ///
    /// The name is the conflict key: a package that moved on disk or changed
    /// configuration keeps its id, so module ownership survives the refresh.
    pub fn upsert_package(
        &mut self,
        name: &str,
        root: &Path,
        config: &Value,
        config_digest: Option<&str>,
    ) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO packages (name, path, config_blob, config_digest) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO UPDATE SET \
             path = excluded.path, config_blob = excluded.config_blob, \
             config_digest = excluded.config_digest \
             RETURNING id",
            params![name, path_text(root), config.to_string(), config_digest],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Look up the package whose root path matches exactly
    pub fn find_package_by_path(&self, root: &Path) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM packages WHERE path = ?1",
                params![path_text(root)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Remove a package and, through cascades, everything it owns
    pub fn delete_package(&mut self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM packages WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}
