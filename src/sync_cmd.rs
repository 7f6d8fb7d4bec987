//! `sync` command: full index rebuild for a project tree.

use std::path::Path;

use anyhow::Result;

use sextant::output::SyncReport;
use sextant::sync::{run_sync, SyncOptions};

/// Run a full sync and print the JSON summary on stdout
///
/// Progress goes to stderr inside the pipeline; stdout carries exactly one
/// line so build tooling can parse it.
pub fn run_sync_command(project_root: &Path) -> Result<()> {
    let outcome = run_sync(project_root, &SyncOptions::default())?;
    let report = SyncReport::new(outcome.counts, outcome.duration);
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
