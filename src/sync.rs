//! Full synchronization pass
//!
//! One pass rebuilds the whole index: compile, discover projects, resolve
//! the dependency closure, then per package upsert the row, partition
//! candidates by digest, extract the changed ones in parallel and write
//! sequentially, finishing with the auto-open recompute. Progress lines go
//! to stderr; the stdout envelope is the caller's job.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;

use crate::changes;
use crate::config::ManifestCache;
use crate::extract::{extract_batch, DocTool};
use crate::resolver::{self, ResolvedPackage, RUNTIME_PACKAGE};
use crate::store::{FileModules, IndexCounts, SymbolStore, SYNC_BUSY_TIMEOUT};

/// External build invocation run once before indexing
#[derive(Debug, Clone)]
pub struct CompileCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CompileCommand {
    fn default() -> Self {
        Self {
            program: "bunx".to_string(),
            args: vec!["rescript".to_string()],
        }
    }
}

impl CompileCommand {
    /// Run the build in `project_root`, failing on a non-zero exit
    ///
    /// Every later digest depends on the artifacts this step emits, so a
    /// failed build aborts the pass before any file processing.
    fn run(&self, project_root: &Path) -> Result<()> {
        which::which(&self.program)
            .with_context(|| format!("{} is not installed or not on PATH", self.program))?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(project_root)
            .output()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.is_empty() {
                "Unknown error"
            } else {
                stderr.as_ref()
            };
            bail!("ReScript compilation failed: {}", detail);
        }
        Ok(())
    }
}

/// Injectable commands so tests can run the pass hermetically
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub compile: CompileCommand,
    pub doc_tool: DocTool,
}

/// What a completed pass did
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub counts: IndexCounts,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub duration: Duration,
}

/// Rebuild the index for the project rooted at `project_root`
pub fn run_sync(project_root: &Path, options: &SyncOptions) -> Result<SyncOutcome> {
    let started = Instant::now();
    eprintln!("Starting ReScript database sync...");

    let index_file = resolver::index_path(project_root)?;
    let mut store = SymbolStore::open(&index_file, SYNC_BUSY_TIMEOUT)?;

    eprintln!("Compiling ReScript...");
    options.compile.run(project_root)?;

    eprintln!("Discovering ReScript projects...");
    let projects = resolver::discover_projects(project_root);
    eprintln!("Found {} project(s)", projects.len());
    if projects.is_empty() {
        bail!("No ReScript packages found in {}", project_root.display());
    }

    eprintln!("Resolving dependencies...");
    let mut package_map: IndexMap<String, ResolvedPackage> = IndexMap::new();
    if let Some(runtime) = resolver::resolve_package(RUNTIME_PACKAGE, project_root) {
        package_map.insert(runtime.name.clone(), runtime);
    }
    for project in projects {
        let dependencies = project.config.manifest.dependencies.clone();
        package_map.insert(project.name.clone(), project);
        for dependency in dependencies {
            if !package_map.contains_key(&dependency) {
                if let Some(resolved) = resolver::resolve_package(&dependency, project_root) {
                    package_map.insert(dependency, resolved);
                }
            }
        }
    }
    eprintln!("Total packages to index: {}", package_map.len());

    let runtime_path = resolver::runtime_path(project_root);
    let mut manifests = ManifestCache::new();

    // Flags are recomputed from scratch each pass; a mark whose flag went
    // away must not survive.
    store.clear_auto_open_flags()?;

    let mut files_processed = 0;
    let mut files_skipped = 0;

    for (name, package) in &package_map {
        eprintln!("Processing package: {}", name);

        let config_digest = resolver::package_config_digest(&package.root);
        let package_id = store.upsert_package(
            name,
            &package.root,
            &package.config.raw,
            config_digest.as_deref(),
        )?;

        let candidates = changes::candidate_files(&package.root);
        eprintln!("  Found {} ReScript file(s)", candidates.len());

        let mut extra_env: Vec<(String, String)> = Vec::new();
        if package.is_runtime() {
            if let Some(path) = &runtime_path {
                extra_env.push(("RESCRIPT_RUNTIME".to_string(), path.clone()));
            }
        }

        let change_set = changes::detect_changes(&store, &candidates)?;
        files_skipped += change_set.skipped;

        if !change_set.pending.is_empty() {
            eprintln!(
                "  Processing {} changed file(s)...",
                change_set.pending.len()
            );

            let paths: Vec<PathBuf> = change_set.pending.iter().map(|p| p.path.clone()).collect();
            let mut results = extract_batch(&options.doc_tool, &paths, &package.root, &extra_env);

            let mut batch = Vec::with_capacity(change_set.pending.len());
            for pending in change_set.pending {
                let modules = results.remove(&pending.path).unwrap_or_default();
                let source = resolver::find_source_file(&mut manifests, &pending.path, &package.root);
                batch.push(FileModules {
                    compiled_file_path: pending.path,
                    source_file_path: source,
                    file_digest: pending.digest,
                    modules,
                });
            }
            files_processed += store.store_package_batch(package_id, &batch)?;
        }

        store.apply_auto_open(
            package_id,
            package.is_runtime(),
            &package.config.manifest.compiler_flags,
        )?;
    }

    let counts = store.counts()?;
    let duration = started.elapsed();

    eprintln!("\nSync completed successfully!");
    eprintln!("  Duration: {:.2}s", duration.as_secs_f64());
    eprintln!("  Packages: {}", counts.packages);
    eprintln!(
        "  Modules: {} ({} processed, {} skipped)",
        counts.modules, files_processed, files_skipped
    );
    eprintln!("  Types: {}", counts.types);
    eprintln!("  Values: {}", counts.values);

    Ok(SyncOutcome {
        counts,
        files_processed,
        files_skipped,
        duration,
    })
}
