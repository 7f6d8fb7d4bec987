//! Change detection over compiled candidate files
//!
//! Candidates are the `.res`/`.resi` files the compiler mirrors into
//! `lib/ocaml`. Each is paired with a `.cmi` artifact whose content digest
//! decides whether the file needs re-extraction. Detection is read-only:
//! the slow extraction step runs on the resulting pending set before any
//! write transaction opens.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::digest;
use crate::store::SymbolStore;

/// A candidate awaiting (re)processing, with its artifact digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub digest: Option<String>,
}

/// One package's candidates split into work and skips
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub pending: Vec<PendingFile>,
    /// Existing module rows left untouched, the unit the sync summary
    /// counts as "skipped"
    pub skipped: usize,
}

/// List extraction candidates below one package root
///
/// Everything sits flat in `lib/ocaml`: every interface file, plus every
/// implementation file without an interface sibling. Interface files come
/// first; both groups are sorted for stable ordering.
pub fn candidate_files(package_root: &Path) -> Vec<PathBuf> {
    let ocaml_dir = package_root.join("lib").join("ocaml");
    let entries = match fs::read_dir(&ocaml_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut implementations = Vec::new();
    let mut interfaces = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        match path.extension().and_then(OsStr::to_str) {
            Some("res") => implementations.push(path),
            Some("resi") => interfaces.push(path),
            _ => {}
        }
    }
    implementations.sort();
    interfaces.sort();

    let interface_set: HashSet<PathBuf> = interfaces.iter().cloned().collect();
    let mut candidates = interfaces;
    for path in implementations {
        if !interface_set.contains(&path.with_extension("resi")) {
            candidates.push(path);
        }
    }
    candidates
}

/// The compiled artifact whose digest drives change detection
pub fn artifact_path(candidate: &Path) -> PathBuf {
    candidate.with_extension("cmi")
}

/// Partition candidates by comparing stored digests against fresh artifact
/// digests
///
/// A file is pending when no module row references it yet, when its artifact
/// cannot be digested (reprocess rather than trust possibly stale rows), or
/// when any referencing row's stored digest differs from the fresh one.
pub fn detect_changes(store: &SymbolStore, candidates: &[PathBuf]) -> Result<ChangeSet> {
    let mut set = ChangeSet::default();
    for candidate in candidates {
        let existing = store.modules_for_compiled_file(candidate)?;
        let fresh = digest::digest_file(&artifact_path(candidate));

        let needs_processing = existing.is_empty()
            || fresh.is_none()
            || existing.iter().any(|row| row.file_digest != fresh);

        if needs_processing {
            set.pending.push(PendingFile {
                path: candidate.clone(),
                digest: fresh,
            });
        } else {
            set.skipped += existing.len().max(1);
        }
    }
    Ok(set)
}
