//! Sextant CLI - ReScript symbol index
//!
//! Usage: sextant <command> [arguments]

mod query_cmd;
mod sync_cmd;
mod update_cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use serde_json::json;

fn print_usage() {
    eprintln!("Sextant - queryable symbol index for ReScript workspaces");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  sextant sync [project_root]       Sync/create the index (defaults to cwd)");
    eprintln!("  sextant update <js-output-path>   Incremental update for a single module (js-post-build)");
    eprintln!("  sextant query \"SELECT ...\"        Run a SELECT query against the index");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  sextant sync");
    eprintln!("  sextant sync /path/to/project");
    eprintln!("  sextant update lib/bs/src/App.res.jsx");
    eprintln!("  sextant query \"SELECT name FROM packages\"");
    eprintln!(
        "  sextant query \"SELECT name, signature FROM \\\"values\\\" WHERE name LIKE '%map%' LIMIT 10\""
    );
}

enum Command {
    Sync { project_root: PathBuf },
    Update { js_output_path: PathBuf },
    Query { sql: String },
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    if command == "--version" || command == "-V" {
        println!("{}", sextant::version::version());
        std::process::exit(0);
    }

    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    match command.as_str() {
        "sync" => {
            let project_root = match args.get(2) {
                Some(arg) => PathBuf::from(arg),
                None => std::env::current_dir()?,
            };
            Ok(Command::Sync { project_root })
        }
        "update" => {
            let js_output_path = match args.get(2) {
                Some(arg) => PathBuf::from(arg),
                None => {
                    eprintln!("Usage: sextant update <js-output-path>");
                    std::process::exit(1);
                }
            };
            Ok(Command::Update { js_output_path })
        }
        "query" => {
            let sql = match args.get(2) {
                Some(arg) => arg.clone(),
                None => {
                    eprintln!("Usage: sextant query \"SELECT ...\"");
                    std::process::exit(1);
                }
            };
            Ok(Command::Query { sql })
        }
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}

fn main() -> ExitCode {
    match parse_args() {
        Ok(Command::Sync { project_root }) => {
            if let Err(e) = sync_cmd::run_sync_command(&project_root) {
                eprintln!("Sync failed: {}", e);
                println!("{}", json!({ "success": false, "error": e.to_string() }));
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Ok(Command::Update { js_output_path }) => {
            match update_cmd::run_update_hook(&js_output_path) {
                Ok(exit_code) => ExitCode::from(exit_code),
                Err(e) => {
                    eprintln!("[js-post-build] Update failed: {}", e);
                    ExitCode::from(1)
                }
            }
        }
        Ok(Command::Query { sql }) => {
            if let Err(e) = query_cmd::run_query_command(&sql) {
                eprintln!("Query failed: {}", e);
                println!("{}", json!({ "error": e.to_string() }));
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            ExitCode::from(1)
        }
    }
}
