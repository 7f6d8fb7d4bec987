//! Extraction adapter: external doc tool to normalized module trees.
//!
//! Extraction is the slow, parallelizable, read-only phase. A bounded pool
//! fans out one tool invocation per changed file and every result is
//! collected before any store mutation begins; workers never touch the
//! store.

mod normalize;
mod tool;

pub use normalize::{parse_module_docs, AliasDoc, AliasKind, ModuleDoc, TypeDoc, ValueDoc};
pub use tool::{DocTool, ExtractError, DEFAULT_TIMEOUT};

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Worker cap for the extraction fan-out
pub const MAX_WORKERS: usize = 12;

/// Extract a batch of files concurrently
///
/// # Behavior
/// A failed file is reported on stderr and contributes an empty tree list;
/// sibling extractions are unaffected. Results are keyed by file path.
pub fn extract_batch(
    tool: &DocTool,
    files: &[PathBuf],
    cwd: &Path,
    extra_env: &[(String, String)],
) -> HashMap<PathBuf, Vec<ModuleDoc>> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(MAX_WORKERS)
        .build()
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("Could not build extraction pool: {}", err);
            return files.iter().map(|f| (f.clone(), Vec::new())).collect();
        }
    };

    pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let docs = match tool.extract(file, cwd, extra_env) {
                    Ok(docs) => docs,
                    Err(err) => {
                        eprintln!("  Extraction failed for {}: {}", file.display(), err);
                        Vec::new()
                    }
                };
                (file.clone(), docs)
            })
            .collect()
    })
}
