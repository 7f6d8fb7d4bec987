//! Module tree persistence: flatten, upsert, replace
//!
//! Extracted trees arrive as [`ModuleDoc`] forests. Each forest is flattened
//! into a pre-order arena first, then written row by row, so arbitrarily
//! deep nesting never grows the call stack and every parent id is known
//! before its children are written.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::extract::ModuleDoc;

use super::{path_text, SymbolStore};

/// One candidate file's extraction output, ready to persist
#[derive(Debug, Clone)]
pub struct FileModules {
    pub compiled_file_path: PathBuf,
    pub source_file_path: PathBuf,
    pub file_digest: Option<String>,
    pub modules: Vec<ModuleDoc>,
}

/// A module in flattened pre-order; `parent` indexes into the same arena
#[derive(Debug, Clone, Copy)]
pub struct FlatModule<'a> {
    pub doc: &'a ModuleDoc,
    pub parent: Option<usize>,
}

/// Flatten a module forest into pre-order, parents before children,
/// siblings in declaration order
pub fn flatten_module_trees(roots: &[ModuleDoc]) -> Vec<FlatModule<'_>> {
    let mut arena = Vec::new();
    let mut stack: Vec<(&ModuleDoc, Option<usize>)> = Vec::new();
    // Pushed in reverse so popping walks left to right.
    for root in roots.iter().rev() {
        stack.push((root, None));
    }
    while let Some((doc, parent)) = stack.pop() {
        let index = arena.len();
        arena.push(FlatModule { doc, parent });
        for child in doc.children.iter().rev() {
            stack.push((child, Some(index)));
        }
    }
    arena
}

/// Module row as seen by the change detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModule {
    pub id: i64,
    pub qualified_name: String,
    pub file_digest: Option<String>,
}

impl StoredModule {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            qualified_name: row.get(1)?,
            file_digest: row.get(2)?,
        })
    }
}

impl SymbolStore {
    /// Write every changed file of one package in a single transaction
    ///
    /// # Returns
    /// The number of root modules written, the unit the sync summary counts
    /// as "processed".
    pub fn store_package_batch(&mut self, package_id: i64, files: &[FileModules]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        for file in files {
            written += write_file_modules(&tx, package_id, file)?;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Replace the subtrees rooted at `file`'s modules, for the single-file
    /// update hook
    ///
    /// Same upsert as the sync batch, scoped to one file: existing rows are
    /// reused with their stale children purged, so provenance follows the
    /// new artifact while the auto-open flag stays as the last resolver
    /// pass set it.
    pub fn replace_module_subtree(&mut self, package_id: i64, file: &FileModules) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let written = write_file_modules(&tx, package_id, file)?;
        tx.commit()?;
        Ok(written)
    }

    /// Look up one module row by its unique qualified name
    pub fn find_module(&self, qualified_name: &str) -> Result<Option<StoredModule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, qualified_name, file_digest FROM modules WHERE qualified_name = ?1",
                params![qualified_name],
                StoredModule::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Every module row derived from one compiled artifact path
    pub fn modules_for_compiled_file(&self, compiled: &Path) -> Result<Vec<StoredModule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, qualified_name, file_digest FROM modules WHERE compiled_file_path = ?1",
        )?;
        let rows = stmt
            .query_map(params![path_text(compiled)], StoredModule::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Remove a module row; cascades take its subtree and symbols with it
    pub fn delete_module(&mut self, qualified_name: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM modules WHERE qualified_name = ?1",
            params![qualified_name],
        )?;
        Ok(deleted > 0)
    }
}

fn write_file_modules(conn: &Connection, package_id: i64, file: &FileModules) -> Result<usize> {
    let arena = flatten_module_trees(&file.modules);
    let mut row_ids: Vec<i64> = Vec::with_capacity(arena.len());
    for node in &arena {
        let parent_row_id = node.parent.map(|index| row_ids[index]);
        let module_id = upsert_module_row(conn, package_id, parent_row_id, node.doc, file)?;
        insert_symbol_rows(conn, module_id, node.doc)?;
        row_ids.push(module_id);
    }
    Ok(file.modules.len())
}

fn upsert_module_row(
    conn: &Connection,
    package_id: i64,
    parent_module_id: Option<i64>,
    doc: &ModuleDoc,
    file: &FileModules,
) -> Result<i64> {
    let inserted = conn.query_row(
        "INSERT INTO modules (package_id, parent_module_id, name, qualified_name, \
         source_file_path, compiled_file_path, file_digest, is_auto_opened) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0) RETURNING id",
        params![
            package_id,
            parent_module_id,
            doc.name,
            doc.qualified_name,
            path_text(&file.source_file_path),
            path_text(&file.compiled_file_path),
            file.file_digest,
        ],
        |row| row.get(0),
    );
    match inserted {
        Ok(id) => Ok(id),
        Err(err) if is_unique_violation(&err) => {
            let id: i64 = conn.query_row(
                "SELECT id FROM modules WHERE qualified_name = ?1",
                params![doc.qualified_name],
                |row| row.get(0),
            )?;
            // Reused row: stale children go before the fresh insert, the
            // provenance columns follow the new artifact, and the
            // auto-open flag is left as the last resolver pass set it.
            purge_module_children(conn, id)?;
            conn.execute(
                "UPDATE modules SET source_file_path = ?1, compiled_file_path = ?2, \
                 file_digest = ?3 WHERE id = ?4",
                params![
                    path_text(&file.source_file_path),
                    path_text(&file.compiled_file_path),
                    file.file_digest,
                    id,
                ],
            )?;
            Ok(id)
        }
        Err(err) => Err(err.into()),
    }
}

/// Delete a module's owned symbols and child modules, keeping the row itself.
/// Child module rows cascade down to their own symbols.
fn purge_module_children(conn: &Connection, module_id: i64) -> Result<()> {
    conn.execute("DELETE FROM types WHERE module_id = ?1", params![module_id])?;
    conn.execute(
        "DELETE FROM \"values\" WHERE module_id = ?1",
        params![module_id],
    )?;
    conn.execute(
        "DELETE FROM aliases WHERE source_module_id = ?1",
        params![module_id],
    )?;
    conn.execute(
        "DELETE FROM modules WHERE parent_module_id = ?1",
        params![module_id],
    )?;
    Ok(())
}

fn insert_symbol_rows(conn: &Connection, module_id: i64, doc: &ModuleDoc) -> Result<()> {
    for t in &doc.types {
        conn.execute(
            "INSERT INTO types (module_id, name, kind, signature, detail_json) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![module_id, t.name, t.kind, t.signature, t.detail.to_string()],
        )?;
    }
    for v in &doc.values {
        conn.execute(
            "INSERT INTO \"values\" (module_id, name, return_type, param_count, signature, detail_json) \
             VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
            params![module_id, v.name, v.param_count, v.signature, v.detail.to_string()],
        )?;
    }
    for a in &doc.aliases {
        conn.execute(
            "INSERT INTO aliases (source_module_id, alias_name, alias_kind, \
             target_qualified_name, docstrings_json) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                module_id,
                a.name,
                a.kind.as_str(),
                a.target_qualified_name,
                a.docstrings.to_string(),
            ],
        )?;
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod flatten_tests {
    use super::*;

    fn module(name: &str, qualified: &str, children: Vec<ModuleDoc>) -> ModuleDoc {
        ModuleDoc {
            name: name.to_string(),
            qualified_name: qualified.to_string(),
            types: Vec::new(),
            values: Vec::new(),
            aliases: Vec::new(),
            children,
        }
    }

    #[test]
    fn flatten_is_preorder_with_parents_first() {
        let forest = vec![
            module(
                "A",
                "A",
                vec![
                    module("B", "A.B", vec![module("C", "A.B.C", vec![])]),
                    module("D", "A.D", vec![]),
                ],
            ),
            module("E", "E", vec![]),
        ];

        let arena = flatten_module_trees(&forest);
        let order: Vec<&str> = arena.iter().map(|n| n.doc.qualified_name.as_str()).collect();
        assert_eq!(order, vec!["A", "A.B", "A.B.C", "A.D", "E"]);

        let parents: Vec<Option<usize>> = arena.iter().map(|n| n.parent).collect();
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(0), None]);
        for (index, node) in arena.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent < index, "parent must precede child");
            }
        }
    }

    #[test]
    fn flatten_keeps_parent_ids_resolvable_at_depth() {
        let mut doc = module("M0", "M0", vec![]);
        for depth in 1..=512 {
            let name = format!("M{depth}");
            let mut outer = module(&name, &name, vec![]);
            outer.children.push(doc);
            doc = outer;
        }
        let arena = flatten_module_trees(std::slice::from_ref(&doc));
        assert_eq!(arena.len(), 513);
        assert_eq!(arena[0].doc.qualified_name, "M512");
        assert_eq!(arena[512].doc.qualified_name, "M0");
        assert_eq!(arena[512].parent, Some(511));
    }
}
