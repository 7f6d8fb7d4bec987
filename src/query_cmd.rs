//! `query` command: read-only SQL against the index.

use anyhow::{bail, Result};

use sextant::resolver;
use sextant::store::{SymbolStore, SYNC_BUSY_TIMEOUT};

/// Validate, execute and pretty-print one SELECT statement
pub fn run_query_command(sql: &str) -> Result<()> {
    let project_root = std::env::current_dir()?;
    let index_file = resolver::index_path(&project_root)?;
    if !index_file.is_file() {
        bail!(
            "Database not found at {}. Run 'sync' first.",
            index_file.display()
        );
    }

    let store = SymbolStore::open(&index_file, SYNC_BUSY_TIMEOUT)?;
    let rows = store.run_query(sql)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
