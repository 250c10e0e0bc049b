//! Command implementations.

mod info;
mod run;

use std::path::Path;

use calltrace::TraceConfig;
use tracing::error;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Run { .. } => handle_run(cli),
        Commands::Info { .. } => handle_info(cli),
    }
}

fn handle_run(cli: &Cli) -> i32 {
    let Commands::Run {
        script,
        config,
        enable,
        output,
    } = &cli.command
    else {
        unreachable!("run command variant mismatch");
    };

    run::cmd_run(script, config.as_deref(), *enable, output.as_deref())
}

fn handle_info(cli: &Cli) -> i32 {
    let Commands::Info { config } = &cli.command else {
        unreachable!("info command variant mismatch");
    };

    info::cmd_info(config.as_deref())
}

/// Config file (or defaults), then the environment override.
fn load_config(path: Option<&Path>) -> Option<TraceConfig> {
    let config = match path {
        Some(path) => TraceConfig::load(path).and_then(TraceConfig::with_env),
        None => TraceConfig::from_env(),
    };
    match config {
        Ok(config) => Some(config),
        Err(e) => {
            error!(error = %e, "invalid configuration");
            None
        }
    }
}
