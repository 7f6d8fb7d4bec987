//! Single-module incremental update for the post-build hook
//!
//! The build pipeline invokes this after recompiling one file. The hook is
//! best-effort: anything short of a broken setup is a silent no-op, so a
//! build never fails because the index lagged behind. Extraction runs
//! before the store opens; the write lock is never held across the
//! external call.

use std::path::Path;

use anyhow::Result;

use crate::config::ManifestCache;
use crate::digest;
use crate::extract::DocTool;
use crate::resolver;
use crate::store::{FileModules, SymbolStore, UPDATE_BUSY_TIMEOUT};

/// Injectable doc tool so tests can run the hook hermetically
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub doc_tool: DocTool,
}

/// What the hook did; the caller decides what to report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No index exists here or at the monorepo root
    NoIndex,
    /// The compiled artifact is missing or unreadable
    NoArtifact,
    /// Extraction failed or produced no modules
    NothingExtracted,
    /// The stored digest already matches the artifact
    UpToDate,
    /// The package was never synced into this index
    UnknownPackage,
    Updated {
        module: String,
        modules_written: usize,
    },
}

/// Module name from a build product: the basename up to the first dot
pub fn module_stem(js_output_path: &Path) -> Option<String> {
    let name = js_output_path.file_name()?.to_string_lossy();
    let stem = name.split('.').next().unwrap_or("");
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Refresh one module's rows if its compiled artifact changed
pub fn run_update(
    project_root: &Path,
    module_name: &str,
    options: &UpdateOptions,
) -> Result<UpdateOutcome> {
    let index_file = match resolver::find_index_path(project_root) {
        Some(path) => path,
        None => return Ok(UpdateOutcome::NoIndex),
    };

    let ocaml_dir = project_root.join("lib").join("ocaml");
    let artifact = ocaml_dir.join(format!("{}.cmi", module_name));
    let fresh_digest = match digest::digest_file(&artifact) {
        Some(digest) => digest,
        None => return Ok(UpdateOutcome::NoArtifact),
    };

    let interface = ocaml_dir.join(format!("{}.resi", module_name));
    let candidate = if interface.is_file() {
        interface
    } else {
        ocaml_dir.join(format!("{}.res", module_name))
    };

    let modules = match options.doc_tool.extract(&candidate, project_root, &[]) {
        Ok(modules) if !modules.is_empty() => modules,
        _ => return Ok(UpdateOutcome::NothingExtracted),
    };

    let mut manifests = ManifestCache::new();
    let source = resolver::find_source_file(&mut manifests, &candidate, project_root);

    let mut store = SymbolStore::open(&index_file, UPDATE_BUSY_TIMEOUT)?;

    if let Some(row) = store.find_module(module_name)? {
        if row.file_digest.as_deref() == Some(fresh_digest.as_str()) {
            return Ok(UpdateOutcome::UpToDate);
        }
    }

    let package_id = match store.find_package_by_path(project_root)? {
        Some(id) => id,
        None => return Ok(UpdateOutcome::UnknownPackage),
    };

    let file = FileModules {
        compiled_file_path: candidate,
        source_file_path: source,
        file_digest: Some(fresh_digest),
        modules,
    };
    let modules_written = store.replace_module_subtree(package_id, &file)?;

    Ok(UpdateOutcome::Updated {
        module: module_name.to_string(),
        modules_written,
    })
}
