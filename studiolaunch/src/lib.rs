//! studiolaunch CLI library: argument parsing, configuration resolution and
//! command dispatch. `main.rs` logs a failure and maps it to a process exit code.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use studiolaunch_core::config::{EnvSnapshot, LaunchConfig};
use studiolaunch_core::observability;
use studiolaunch_runtime::LaunchError;

/// Parse arguments, resolve configuration and run the selected command.
/// Returns the exit code for a command that completed.
pub fn run_cli() -> Result<i32> {
    let cli = Cli::parse();

    let dotenv = Path::new(".env");
    let mut env = EnvSnapshot::from_process();
    let merged = if cli.launch.no_dotenv {
        None
    } else {
        env.merge_dotenv(dotenv)
    };
    // After the merge, so .env can set the log level.
    observability::init_tracing(&env);
    if let Some(merged) = merged {
        tracing::debug!(path = %dotenv.display(), merged, "Loaded .env");
    }

    let config = LaunchConfig::from_env(&env).with_overrides(cli.launch.overrides());
    let command = cli.command.unwrap_or(Commands::Run);
    tracing::debug!(
        ?command,
        port = config.port,
        venv = %config.venv_dir.display(),
        "Resolved configuration"
    );

    match command {
        Commands::Run => commands::run::cmd_run(&config, &env),
        Commands::Plan { json } => {
            commands::plan::cmd_plan(&config, &env, json)?;
            Ok(0)
        }
    }
}

/// Exit code for a failed command: a failed setup subprocess propagates its
/// own status, anything else is 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LaunchError>()
        .map(LaunchError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_launch_error() {
        let err = anyhow::Error::new(LaunchError::Migration { code: Some(5) });
        assert_eq!(exit_code_for(&err), 5);
        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&err), 1);
    }
}
