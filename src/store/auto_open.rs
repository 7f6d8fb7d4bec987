//! Auto-open flags: modules visible without qualification
//!
//! Recomputed on every sync pass: all flags are cleared first, then each
//! package contributes its marks, so a flag removed from a package's
//! compiler configuration disappears from the index on the next pass.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;

use super::SymbolStore;

/// Types the compiler provides without any declaration. Seeded under the
/// runtime package's `Pervasives` module so unqualified type lookups resolve.
pub const BUILTIN_TYPES: [(&str, &str, &str); 16] = [
    ("int", "unknown", "type int"),
    ("char", "unknown", "type char"),
    ("float", "unknown", "type float"),
    ("bool", "unknown", "type bool"),
    ("unit", "unknown", "type unit"),
    ("string", "unknown", "type string"),
    ("bigint", "unknown", "type bigint"),
    ("unknown", "unknown", "type unknown"),
    ("exn", "unknown", "type exn"),
    ("array", "unknown", "type array<'a>"),
    ("list", "unknown", "type list<'a>"),
    ("option", "unknown", "type option<'a>"),
    ("result", "unknown", "type result<'a, 'b>"),
    ("dict", "unknown", "type dict<'a>"),
    ("promise", "unknown", "type promise<'a>"),
    ("extension_constructor", "unknown", "type extension_constructor"),
];

impl SymbolStore {
    /// Drop every auto-open mark so a sync pass can recompute from scratch
    pub fn clear_auto_open_flags(&mut self) -> Result<usize> {
        let cleared = self.conn.execute(
            "UPDATE modules SET is_auto_opened = 0 WHERE is_auto_opened = 1",
            [],
        )?;
        Ok(cleared)
    }

    /// Mark the modules one package opens implicitly
    ///
    /// The runtime package always opens `Stdlib` and `Pervasives` and seeds
    /// the builtin types under its own `Pervasives` row. Every other package
    /// contributes the targets of its `-open` compiler flags.
    pub fn apply_auto_open(
        &mut self,
        package_id: i64,
        runtime: bool,
        compiler_flags: &[String],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        if runtime {
            tx.execute(
                "UPDATE modules SET is_auto_opened = 1 WHERE qualified_name = ?1",
                params!["Stdlib"],
            )?;
            tx.execute(
                "UPDATE modules SET is_auto_opened = 1 WHERE qualified_name = ?1",
                params!["Pervasives"],
            )?;

            let pervasives: Option<i64> = tx
                .query_row(
                    "SELECT id FROM modules WHERE qualified_name = 'Pervasives' AND package_id = ?1",
                    params![package_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(module_id) = pervasives {
                seed_builtin_types(&tx, module_id)?;
            }
        } else {
            for flag in compiler_flags {
                if let Some(target) = flag.strip_prefix("-open ") {
                    tx.execute(
                        "UPDATE modules SET is_auto_opened = 1 WHERE qualified_name = ?1",
                        params![target.trim()],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Qualified names currently marked auto-opened, in name order
    pub fn auto_opened_modules(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT qualified_name FROM modules WHERE is_auto_opened = 1 ORDER BY qualified_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

/// Insert any builtin type missing under `module_id`; present rows stay put
fn seed_builtin_types(conn: &Connection, module_id: i64) -> Result<()> {
    for (name, kind, signature) in BUILTIN_TYPES {
        let present: Option<i64> = conn
            .query_row(
                "SELECT id FROM types WHERE module_id = ?1 AND name = ?2 AND signature = ?3",
                params![module_id, name, signature],
                |row| row.get(0),
            )
            .optional()?;
        if present.is_none() {
            conn.execute(
                "INSERT INTO types (module_id, name, kind, signature, detail_json) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    module_id,
                    name,
                    kind,
                    signature,
                    json!({"builtin": true, "source": "compiler"}).to_string(),
                ],
            )?;
        }
    }
    Ok(())
}
