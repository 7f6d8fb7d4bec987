//! Sextant: a queryable symbol index for ReScript workspaces
//!
//! Sextant compiles a project, extracts per-module documentation with the
//! ReScript tooling, and persists the symbol surface (modules, types,
//! values, aliases) to a SQLite index that plain SELECT statements can
//! interrogate.
//!
//! Three entry points cover the pipeline:
//! - [`sync::run_sync`] rebuilds the index for a whole project tree
//! - [`update::run_update`] refreshes one module after an incremental build
//! - [`store::SymbolStore::run_query`] serves read-only SQL against the index
//!
//! # Digest Conventions
//!
//! Change detection hashes compiled `.cmi` artifacts, not sources: the
//! artifact digest changes exactly when a module's public surface does. A
//! file whose digest cannot be computed is always reprocessed.

pub mod changes;
pub mod config;
pub mod digest;
pub mod extract;
pub mod output;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod update;
pub mod version;

pub use changes::{candidate_files, detect_changes, ChangeSet, PendingFile};
pub use config::{LoadedManifest, Manifest, ManifestCache};
pub use extract::{extract_batch, DocTool, ExtractError, ModuleDoc};
pub use output::SyncReport;
pub use resolver::{
    discover_projects, find_index_path, index_path, ResolvedPackage, INDEX_FILE, RUNTIME_PACKAGE,
};
pub use store::{IndexCounts, QueryRow, SymbolStore, SYNC_BUSY_TIMEOUT, UPDATE_BUSY_TIMEOUT};
pub use sync::{run_sync, CompileCommand, SyncOptions, SyncOutcome};
pub use update::{module_stem, run_update, UpdateOptions, UpdateOutcome};
