//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `teamplanner_core` linkage.
//! - Open the configured database once so migrations run before a server
//!   process depends on them.

use log::{error, info};
use std::process::ExitCode;
use teamplanner_core::db::migrations::{current_user_version, latest_version};
use teamplanner_core::{core_version, init_logging, open_db, ping, CoreConfig};

fn main() -> ExitCode {
    println!("teamplanner_core ping={}", ping());
    println!("teamplanner_core version={}", core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_bootstrap module=cli status=error error={message}");
            eprintln!("teamplanner: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
    let schema_version = current_user_version(&conn).map_err(|err| err.to_string())?;
    info!(
        "event=cli_bootstrap module=cli status=ok schema_version={schema_version} delete_empty_groups={}",
        config.delete_empty_groups
    );

    println!("database path={}", config.database_path);
    println!("database schema={schema_version}/{}", latest_version());
    Ok(())
}
