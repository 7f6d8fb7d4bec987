//! Package discovery and dependency resolution.
//!
//! A sync pass indexes every project found under the root (any directory
//! with a `rescript.json`, vendored trees excluded) plus the packages their
//! manifests name. Dependencies resolve through the flat `node_modules`
//! layout first, then through bun's isolated install cache. The runtime
//! package ships without a manifest of its own and gets a synthetic one.

use crate::config::{LoadedManifest, ManifestCache, MANIFEST_FILE};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Always-implicit runtime package, resolved before anything else
pub const RUNTIME_PACKAGE: &str = "@rescript/runtime";

/// Index file kept at the project root
pub const INDEX_FILE: &str = "sextant.db";

/// A package selected for indexing: discovered project or resolved dependency
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub name: String,
    pub root: PathBuf,
    pub config: LoadedManifest,
}

impl ResolvedPackage {
    pub fn is_runtime(&self) -> bool {
        self.name == RUNTIME_PACKAGE
    }
}

/// Find every project package under `root`
///
/// # Behavior
/// Walks the tree for `rescript.json` files, skipping `node_modules`
/// subtrees, in sorted path order for deterministic output. A manifest that
/// fails to parse is reported on stderr and the project skipped.
pub fn discover_projects(root: &Path) -> Vec<ResolvedPackage> {
    let mut manifest_paths = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            manifest_paths.push(entry.into_path());
        }
    }
    manifest_paths.sort();

    let mut projects = Vec::new();
    for manifest_path in manifest_paths {
        let project_dir = match manifest_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => continue,
        };
        match LoadedManifest::read(&project_dir) {
            Ok(loaded) => {
                let name = loaded.manifest.name.clone().unwrap_or_default();
                projects.push(ResolvedPackage {
                    name,
                    root: project_dir,
                    config: loaded,
                });
            }
            Err(err) => {
                eprintln!("Failed to parse {}: {:#}", manifest_path.display(), err);
            }
        }
    }
    projects
}

/// Resolve a package by name against a project root
///
/// # Behavior
/// Tries `<root>/node_modules/<name>` first, then bun's isolated cache.
/// The runtime package needs only a `package.json` and gets a synthetic
/// manifest; every other package must carry a parseable `rescript.json`.
/// Failures are reported on stderr and yield None (the package is omitted
/// from the pass).
pub fn resolve_package(name: &str, project_root: &Path) -> Option<ResolvedPackage> {
    let is_runtime = name == RUNTIME_PACKAGE;

    let standard = project_root.join("node_modules").join(name);
    if standard.is_dir() {
        if is_runtime {
            if standard.join("package.json").is_file() {
                return Some(ResolvedPackage {
                    name: name.to_string(),
                    root: standard,
                    config: LoadedManifest::synthetic(name),
                });
            }
        } else if standard.join(MANIFEST_FILE).is_file() {
            match LoadedManifest::read(&standard) {
                Ok(loaded) => {
                    return Some(ResolvedPackage {
                        name: name.to_string(),
                        root: standard,
                        config: loaded,
                    });
                }
                Err(err) => {
                    eprintln!("Could not read manifest for {}: {:#}", name, err);
                    return None;
                }
            }
        }
    }

    if let Some(isolated) = resolve_from_bun_cache(name, project_root) {
        if is_runtime {
            return Some(ResolvedPackage {
                name: name.to_string(),
                root: isolated,
                config: LoadedManifest::synthetic(name),
            });
        }
        match LoadedManifest::read(&isolated) {
            Ok(loaded) => {
                return Some(ResolvedPackage {
                    name: name.to_string(),
                    root: isolated,
                    config: loaded,
                });
            }
            Err(_) => {
                eprintln!("Could not read rescript.json for {} from bun cache", name);
                return None;
            }
        }
    }

    eprintln!(
        "Could not resolve package {}: not found in node_modules or .bun cache",
        name
    );
    None
}

/// Search bun's isolated install cache for a package directory
///
/// Cache entries live at `node_modules/.bun/<mangled>@<version>/node_modules/
/// <name>` where `<mangled>` is the package name with `/` replaced by `+`.
/// The most recently modified match wins.
fn resolve_from_bun_cache(name: &str, project_root: &Path) -> Option<PathBuf> {
    let bun_dir = project_root.join("node_modules").join(".bun");
    let prefix = format!("{}@", name.replace('/', "+"));

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(&bun_dir).ok()?.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let candidate = entry.path().join("node_modules").join(name);
        if !candidate.is_dir() {
            continue;
        }
        let modified = match candidate.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };
        let newer = match &latest {
            None => true,
            Some((best, _)) => modified > *best,
        };
        if newer {
            latest = Some((modified, candidate));
        }
    }
    latest.map(|(_, path)| path)
}

/// Fields consumed from the compiler's `lib/bs/compiler-info.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompilerInfo {
    pub rescript_config_hash: Option<String>,
    pub runtime_path: Option<String>,
}

/// Read a package's compiler-emitted metadata, if the compiler has run
pub fn read_compiler_info(package_root: &Path) -> Option<CompilerInfo> {
    let path = package_root.join("lib").join("bs").join("compiler-info.json");
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Stable configuration digest for a package, when the compiler provides one
pub fn package_config_digest(package_root: &Path) -> Option<String> {
    read_compiler_info(package_root)?.rescript_config_hash
}

/// Runtime path injected into runtime-package extraction via RESCRIPT_RUNTIME
pub fn runtime_path(project_root: &Path) -> Option<String> {
    read_compiler_info(project_root)?.runtime_path
}

/// Walk up from a package directory to the monorepo root that depends on it
///
/// # Returns
/// The nearest ancestor whose manifest names this package in any of its
/// four dependency lists, or None when the package has no usable name or no
/// such ancestor exists.
pub fn find_monorepo_root(package_dir: &Path) -> Option<PathBuf> {
    let loaded = LoadedManifest::read(package_dir).ok()?;
    let package_name = loaded.manifest.name?;
    if package_name.is_empty() {
        return None;
    }

    let mut dir = package_dir.parent()?;
    loop {
        if let Ok(parent) = LoadedManifest::read(dir) {
            if parent
                .manifest
                .dependency_union()
                .iter()
                .any(|dep| dep == &package_name)
            {
                return Some(dir.to_path_buf());
            }
        }
        dir = dir.parent()?;
    }
}

/// Index location for an explicit project root
///
/// The root must be a directory holding a top-level manifest; `sync` and
/// `query` refuse to guess otherwise.
pub fn index_path(project_root: &Path) -> Result<PathBuf> {
    if !project_root.is_dir() {
        bail!("Project directory does not exist: {}", project_root.display());
    }
    if !project_root.join(MANIFEST_FILE).is_file() {
        bail!(
            "No rescript.json found at: {}. The project root must contain a top-level rescript.json file.",
            project_root.display()
        );
    }
    Ok(project_root.join(INDEX_FILE))
}

/// Locate an existing index for the update hook: the package directory
/// first, then the monorepo root
pub fn find_index_path(package_dir: &Path) -> Option<PathBuf> {
    let local = package_dir.join(INDEX_FILE);
    if local.is_file() {
        return Some(local);
    }

    let root = find_monorepo_root(package_dir)?;
    let shared = root.join(INDEX_FILE);
    if shared.is_file() {
        Some(shared)
    } else {
        None
    }
}

/// Map a compiled candidate file back to its human-authored source
///
/// # Behavior
/// Searches the package's source directories for a file with the same name,
/// preferring an `.resi` interface over its `.res` sibling. Runtime-package
/// files have no separate source and resolve to themselves, as does
/// anything without a match.
pub fn find_source_file(
    cache: &mut ManifestCache,
    compiled_file_path: &Path,
    package_root: &Path,
) -> PathBuf {
    if compiled_file_path.to_string_lossy().contains(RUNTIME_PACKAGE) {
        return compiled_file_path.to_path_buf();
    }
    let file_name = match compiled_file_path.file_name() {
        Some(name) => name.to_os_string(),
        None => return compiled_file_path.to_path_buf(),
    };

    let source_dirs = cache.load(package_root).manifest.source_dirs();
    for dir in source_dirs {
        let source_root = package_root.join(&dir);
        for entry in WalkDir::new(&source_root)
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            if !entry.file_type().is_file() || entry.file_name() != file_name.as_os_str() {
                continue;
            }
            let found = entry.into_path();
            if found.extension().and_then(|e| e.to_str()) == Some("res") {
                let interface = found.with_extension("resi");
                if interface.is_file() {
                    return interface;
                }
            }
            return found;
        }
    }

    compiled_file_path.to_path_buf()
}
