use thiserror::Error;

use crate::config::ConfigError;

/// Hook errors.
///
/// None of these originate from the per-call path: tracing a call never
/// fails as far as the host is concerned.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("interceptor is already active")]
    AlreadyActive,
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HookError>;
