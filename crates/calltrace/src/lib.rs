//! Calltrace - function call tracing for an embedded interpreter
//!
//! Hooks the interpreter's call dispatch and writes one line per call,
//! naming the callee and the call site.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use calltrace::{MemorySink, Script, TraceConfig};
//! use parking_lot::Mutex;
//!
//! let script = Script::parse("1: call greet\n")?;
//! let sink = Arc::new(Mutex::new(MemorySink::new()));
//! calltrace::trace(&script, TraceConfig::enabled(), Arc::clone(&sink))?;
//! assert_eq!(sink.lock().lines()[1], "[main:1] greet()");
//! ```

pub use calltrace_frame::{
    CallFrame, CallKind, ExecutionContext, FunctionRef, OpLine, SyntheticOp, classify,
};
pub use calltrace_hook::{
    ConfigError, DispatchTable, HookError, MemorySink, ModuleInfo, NoopSink, TraceConfig,
    TraceModule, TraceSink, WriterSink,
};

pub mod engine;
pub mod script;

pub use engine::{Engine, RuntimeError, Sim};
pub use script::{Script, ScriptError};

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Calltrace errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("hook error: {0}")]
    Hook(#[from] HookError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Run `script` on a fresh [`Engine`] with the trace module loaded.
///
/// The module is started before the script and shut down after it, even
/// when the script fails.
///
/// # Errors
///
/// Returns the script's [`RuntimeError`] if it raised one, otherwise any
/// module startup or shutdown failure.
pub fn trace<S: TraceSink + 'static>(
    script: &Script,
    config: TraceConfig,
    sink: Arc<Mutex<S>>,
) -> Result<()> {
    let mut engine = Engine::new();
    let mut module: TraceModule<Sim, S> = TraceModule::with_shared_sink(config, sink);
    module.startup(&mut engine)?;
    debug!(file = %script.file, enabled = config.enable, "running script");

    let outcome = engine.run(script);
    let shutdown = module.shutdown(&mut engine);
    if let Err(e) = &shutdown {
        if outcome.is_err() {
            warn!(error = %e, "module shutdown failed");
        }
    }
    outcome?;
    shutdown?;
    Ok(())
}
