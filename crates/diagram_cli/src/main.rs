//! Operator entry point.
//!
//! # Responsibility
//! - Probe crate wiring (`ping`).
//! - Seed the configured store, report or free the edit lock.
//!
//! Configuration comes from `DIAGRAM_*` environment variables.

use diagram_api::DiagramApi;
use diagram_core::logging::init_logging_from_config;
use std::process::ExitCode;

const USAGE: &str = "usage: diagram_cli <ping|seed|status|free-lock>";

fn main() -> ExitCode {
    let Some(command) = std::env::args().nth(1) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    if command == "ping" {
        println!("diagram_core ping={}", diagram_api::ping());
        println!("diagram_core version={}", diagram_api::core_version());
        return ExitCode::SUCCESS;
    }

    let api = match DiagramApi::from_env() {
        Ok(api) => api,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging_from_config(api.config()) {
        eprintln!("logging disabled: {err}");
    }

    let (success, message) = match command.as_str() {
        "seed" => {
            let response = api.seed_db();
            (response.success, response.message)
        }
        "status" => {
            let response = api.is_project_being_edited();
            (
                response.success,
                format!("{} isBeingEdited={}", response.message, response.is_being_edited),
            )
        }
        "free-lock" => {
            let response = api.free_edit_rights();
            (response.success, response.message)
        }
        other => {
            eprintln!("unknown command `{other}`\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    println!("store={} {message}", api.config().db_path.display());
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
