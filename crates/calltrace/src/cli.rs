//! CLI definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "calltrace")]
#[command(about = "Trace every function call made by a script")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a call script with the trace module loaded
    Run {
        /// Call script to execute
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// INI file holding calltrace directives
        #[arg(short, long, value_name = "INI")]
        config: Option<PathBuf>,

        /// Force tracing on, overriding the config file and environment
        #[arg(short, long)]
        enable: bool,

        /// Write trace lines to a file instead of stderr
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print module information
    Info {
        /// INI file holding calltrace directives
        #[arg(short, long, value_name = "INI")]
        config: Option<PathBuf>,
    },
}
