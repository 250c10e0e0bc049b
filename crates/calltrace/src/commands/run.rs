//! Run command.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use calltrace::{Script, TraceSink, WriterSink};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::commands::load_config;

/// Handle the `run` command.
pub fn cmd_run(
    script_path: &Path,
    config_path: Option<&Path>,
    force_enable: bool,
    output: Option<&Path>,
) -> i32 {
    let Some(mut config) = load_config(config_path) else {
        return EXIT_FAILURE;
    };
    if force_enable {
        config.enable = true;
    }

    let script = match Script::load(script_path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %script_path.display(), "failed to load script");
            return EXIT_FAILURE;
        }
    };

    let sink: Box<dyn TraceSink> = match output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(WriterSink::new(BufWriter::new(file))),
            Err(e) => {
                error!(error = %e, path = %path.display(), "failed to create trace output");
                return EXIT_FAILURE;
            }
        },
        None => Box::new(WriterSink::stderr()),
    };

    match calltrace::trace(&script, config, Arc::new(Mutex::new(sink))) {
        Ok(()) => {
            debug!(path = %script_path.display(), traced = config.enable, "script finished");
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, path = %script_path.display(), "script failed");
            EXIT_FAILURE
        }
    }
}
