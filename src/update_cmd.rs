//! `update` command: single-module refresh driven by js-post-build.

use std::path::Path;

use anyhow::Result;

use sextant::update::{module_stem, run_update, UpdateOptions, UpdateOutcome};

/// Run the post-build hook for one compiled output and return the exit code
///
/// # Behavior
/// Most outcomes are silent so the hook never clutters build logs. Only a
/// completed update and an unsynced package say anything, both on stderr.
pub fn run_update_hook(js_output_path: &Path) -> Result<u8> {
    let module_name = match module_stem(js_output_path) {
        Some(name) => name,
        None => {
            eprintln!(
                "Could not extract module name from: {}",
                js_output_path.display()
            );
            return Ok(1);
        }
    };

    let project_root = std::env::current_dir()?;
    match run_update(&project_root, &module_name, &UpdateOptions::default())? {
        UpdateOutcome::Updated {
            module,
            modules_written,
        } => {
            eprintln!("Updated {} ({} module(s))", module, modules_written);
        }
        UpdateOutcome::UnknownPackage => {
            eprintln!(
                "Package not found in db for path: {}. Run 'sync' first.",
                project_root.display()
            );
        }
        UpdateOutcome::NoIndex
        | UpdateOutcome::NoArtifact
        | UpdateOutcome::NothingExtracted
        | UpdateOutcome::UpToDate => {}
    }
    Ok(0)
}
