//! Command-line entry point for the node graph.
//!
//! # Responsibility
//! - Open a database, seed the type system, and evaluate queries.
//! - Print results as JSON on stdout; errors go to stderr with exit code 1.
//!
//! Usage:
//! ```text
//! nodegraph_cli ping
//! nodegraph_cli <db-path> bootstrap
//! nodegraph_cli <db-path> query <query-system-id> [--refresh]
//! nodegraph_cli <db-path> eval '<definition-json>'
//! ```
//!
//! `NODEGRAPH_LOG_DIR` (absolute) enables file logging at
//! `NODEGRAPH_LOG_LEVEL`, or the build-mode default.

use log::info;
use nodegraph_core::{
    bootstrap_system_nodes, default_log_level, init_logging, open_db, NodeService,
    QueryDefinition, SqliteNodeRepository,
};
use serde_json::json;
use std::process::ExitCode;

const USAGE: &str = "usage: nodegraph_cli ping | <db-path> bootstrap | <db-path> query <query-system-id> [--refresh] | <db-path> eval '<definition-json>'";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    init_logging_from_env()?;

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    match arg_refs.as_slice() {
        ["ping"] => Ok(json!({
            "ping": nodegraph_core::ping(),
            "version": nodegraph_core::core_version(),
        })
        .to_string()),
        [db_path, "bootstrap"] => {
            let conn = open_db(db_path).map_err(|err| err.to_string())?;
            let summary = bootstrap_system_nodes(&conn).map_err(|err| err.to_string())?;
            to_json(&summary)
        }
        [db_path, "query", system_id, rest @ ..] => {
            let refresh = match rest {
                [] => false,
                ["--refresh"] => true,
                _ => return Err(USAGE.to_string()),
            };
            let conn = open_db(db_path).map_err(|err| err.to_string())?;
            let repo = SqliteNodeRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let service = NodeService::new(repo);
            let query_node = service
                .find_node(system_id)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("query node not found: {system_id}"))?;
            info!("event=cli_query module=cli status=start refresh={refresh}");
            let page = service
                .evaluate_saved_query(query_node.id, refresh)
                .map_err(|err| err.to_string())?;
            to_json(&page)
        }
        [db_path, "eval", definition_json] => {
            let definition =
                QueryDefinition::from_json(definition_json).map_err(|err| err.to_string())?;
            let conn = open_db(db_path).map_err(|err| err.to_string())?;
            let repo = SqliteNodeRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let page = NodeService::new(repo)
                .evaluate_query(&definition)
                .map_err(|err| err.to_string())?;
            to_json(&page)
        }
        _ => Err(USAGE.to_string()),
    }
}

fn init_logging_from_env() -> Result<(), String> {
    let Ok(log_dir) = std::env::var("NODEGRAPH_LOG_DIR") else {
        return Ok(());
    };
    let level = std::env::var("NODEGRAPH_LOG_LEVEL")
        .unwrap_or_else(|_| default_log_level().to_string());
    init_logging(&level, &log_dir)
}

fn to_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}
