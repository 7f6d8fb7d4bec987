//! Relational schema for the symbol index
//!
//! Five tables: packages own modules, modules own types/values/aliases and
//! child modules. `qualified_name` is unique across the whole index, so a
//! module reached through two packages resolves to one row. All ownership
//! edges cascade on delete; the connection must run with foreign keys on.

/// Executed on every open. Idempotent: tables and indices are created only
/// when missing, existing rows are never touched.
pub(crate) const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    path TEXT NOT NULL,
    config_blob TEXT NOT NULL,
    config_digest TEXT
);

CREATE TABLE IF NOT EXISTS modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id INTEGER NOT NULL,
    parent_module_id INTEGER,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL UNIQUE,
    source_file_path TEXT NOT NULL,
    compiled_file_path TEXT NOT NULL,
    file_digest TEXT,
    is_auto_opened INTEGER DEFAULT 0,
    FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
    FOREIGN KEY (parent_module_id) REFERENCES modules(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    kind TEXT,
    signature TEXT,
    detail_json TEXT,
    FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS "values" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    return_type TEXT,
    param_count INTEGER DEFAULT 0,
    signature TEXT,
    detail_json TEXT,
    FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS aliases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_module_id INTEGER NOT NULL,
    alias_name TEXT NOT NULL,
    alias_kind TEXT NOT NULL,
    target_qualified_name TEXT NOT NULL,
    docstrings_json TEXT,
    FOREIGN KEY (source_module_id) REFERENCES modules(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_modules_package ON modules(package_id);
CREATE INDEX IF NOT EXISTS idx_modules_parent ON modules(parent_module_id);
CREATE INDEX IF NOT EXISTS idx_modules_qualified ON modules(qualified_name);
CREATE INDEX IF NOT EXISTS idx_modules_compiled_path ON modules(compiled_file_path);
CREATE INDEX IF NOT EXISTS idx_types_module ON types(module_id);
CREATE INDEX IF NOT EXISTS idx_values_module ON "values"(module_id);
CREATE INDEX IF NOT EXISTS idx_aliases_name ON aliases(alias_name);
CREATE INDEX IF NOT EXISTS idx_aliases_source ON aliases(source_module_id);
CREATE INDEX IF NOT EXISTS idx_modules_auto_opened ON modules(is_auto_opened);
"#;
