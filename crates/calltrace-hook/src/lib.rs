//! Dispatch interception for interpreter call tracing.
//!
//! This crate provides:
//! - `DispatchTable` trait: the host's two replaceable call entry points
//! - `Interceptor`: saves the entry points, installs tracing wrappers in
//!   front of them and restores the originals on shutdown
//! - `TraceSink` trait and sinks receiving one record per call
//! - `TraceConfig` and `TraceModule` for the module lifecycle
//!
//! # Example
//!
//! ```ignore
//! use calltrace_hook::{TraceConfig, TraceModule, WriterSink};
//!
//! let mut module = TraceModule::new(TraceConfig::enabled(), WriterSink::stderr());
//! module.startup(&mut engine)?;
//! engine.run(&script)?;
//! module.shutdown(&mut engine)?;
//! ```

mod config;
mod dispatch;
mod error;
mod interceptor;
mod module;
mod sink;

pub use config::{ConfigError, TraceConfig, ENABLE_DEFAULT, ENABLE_DIRECTIVE, ENABLE_ENV};
pub use dispatch::{DispatchTable, ExecuteFn, InternalFn, Runtime, SavedDispatch};
pub use error::{HookError, Result};
pub use interceptor::{emit, wrap_interpreted, wrap_native, Interceptor};
pub use module::{ModuleInfo, ModuleState, TraceModule, MODULE_NAME, MODULE_VERSION};
pub use sink::{MemorySink, NoopSink, TraceSink, WriterSink};
