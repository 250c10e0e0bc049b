//! Info command.

use std::path::Path;

use calltrace::ModuleInfo;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::commands::load_config;

/// Handle the `info` command.
pub fn cmd_info(config_path: Option<&Path>) -> i32 {
    let Some(config) = load_config(config_path) else {
        return EXIT_FAILURE;
    };
    print!("{}", ModuleInfo::new(config));
    EXIT_SUCCESS
}
