//! Dispatch interception.
//!
//! [`Interceptor`] owns everything the hook needs for the lifetime of the
//! module: the configuration snapshot, the sink, and the two entry points it
//! saved from the host. On activation it puts wrappers in front of both
//! entry points; each wrapper classifies the pending call, emits it, drops
//! the frame and only then hands the untouched context to the saved
//! original.

use std::sync::Arc;

use calltrace_frame::{CallFrame, ExecutionContext, classify};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::TraceConfig;
use crate::dispatch::{DispatchTable, ExecuteFn, InternalFn, Runtime, SavedDispatch};
use crate::error::{HookError, Result};
use crate::sink::TraceSink;

/// Owned interception state for one host.
pub struct Interceptor<R: Runtime, S: TraceSink + 'static> {
    config: TraceConfig,
    sink: Arc<Mutex<S>>,
    saved: Option<SavedDispatch<R>>,
    installed: bool,
}

impl<R: Runtime, S: TraceSink + 'static> Interceptor<R, S> {
    pub fn new(config: TraceConfig, sink: S) -> Self {
        Self::with_shared_sink(config, Arc::new(Mutex::new(sink)))
    }

    /// Use a sink the caller keeps a handle to.
    pub const fn with_shared_sink(config: TraceConfig, sink: Arc<Mutex<S>>) -> Self {
        Self {
            config,
            sink,
            saved: None,
            installed: false,
        }
    }

    pub const fn config(&self) -> TraceConfig {
        self.config
    }

    pub const fn sink(&self) -> &Arc<Mutex<S>> {
        &self.sink
    }

    /// Entry points have been saved and not yet handed back.
    pub const fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Wrappers are currently installed in the host table.
    pub const fn is_installed(&self) -> bool {
        self.installed
    }

    /// Entry points captured at activation.
    pub const fn saved(&self) -> Option<&SavedDispatch<R>> {
        self.saved.as_ref()
    }

    /// Save the host's entry points and, when tracing is enabled, install
    /// the wrappers.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::AlreadyActive`] if called again before
    /// [`Interceptor::deactivate`]; the table is left untouched.
    pub fn activate<T: DispatchTable<R> + ?Sized>(&mut self, table: &mut T) -> Result<()> {
        if self.saved.is_some() {
            warn!("interceptor activated twice");
            return Err(HookError::AlreadyActive);
        }

        let saved = SavedDispatch::capture(table);
        if self.config.enable {
            let fallback = table.default_internal();
            table.set_execute_ex(self.interpreted_wrapper(&saved));
            table.set_execute_internal(Some(self.native_wrapper(&saved, fallback)));
            self.installed = true;
        }
        debug!(
            enabled = self.config.enable,
            native_override = saved.execute_internal.is_some(),
            "dispatch entry points saved"
        );
        self.saved = Some(saved);
        Ok(())
    }

    /// Put the saved entry points back. No-op if nothing was installed.
    pub fn deactivate<T: DispatchTable<R> + ?Sized>(&mut self, table: &mut T) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        if self.installed {
            saved.restore(table);
            self.installed = false;
            debug!("original dispatch entry points restored");
        }
    }

    fn interpreted_wrapper(&self, saved: &SavedDispatch<R>) -> ExecuteFn<R> {
        let sink = Arc::clone(&self.sink);
        let original = Arc::clone(&saved.execute_ex);
        Arc::new(move |context: &R::Context| wrap_interpreted(&*sink, &*original, context))
    }

    fn native_wrapper(&self, saved: &SavedDispatch<R>, fallback: InternalFn<R>) -> InternalFn<R> {
        let sink = Arc::clone(&self.sink);
        let original = saved.execute_internal.clone();
        Arc::new(move |context: &R::Context, info: &mut R::CallInfo| {
            wrap_native(&*sink, original.as_deref(), &*fallback, context, info)
        })
    }
}

/// Trace an interpreted call, then run it through `original`.
///
/// The original's output is returned as is; a panic in it unwinds through
/// this frame untouched.
pub fn wrap_interpreted<C, O, F, S>(sink: &Mutex<S>, original: &F, context: &C) -> O
where
    C: ExecutionContext + ?Sized,
    F: Fn(&C) -> O + ?Sized,
    S: TraceSink + ?Sized,
{
    trace_call(sink, context, false);
    original(context)
}

/// Trace a native call, then run it through `original`, or through the
/// host's `fallback` primitive when no override was saved.
pub fn wrap_native<C, I, O, F, G, S>(
    sink: &Mutex<S>,
    original: Option<&F>,
    fallback: &G,
    context: &C,
    info: &mut I,
) -> O
where
    C: ExecutionContext + ?Sized,
    I: ?Sized,
    F: Fn(&C, &mut I) -> O + ?Sized,
    G: Fn(&C, &mut I) -> O + ?Sized,
    S: TraceSink + ?Sized,
{
    trace_call(sink, context, true);
    match original {
        Some(execute) => execute(context, info),
        None => fallback(context, info),
    }
}

// The frame and the sink lock are both released before the caller
// re-enters the interpreter.
fn trace_call<C, S>(sink: &Mutex<S>, context: &C, internal: bool)
where
    C: ExecutionContext + ?Sized,
    S: TraceSink + ?Sized,
{
    let frame = classify(context, internal);
    emit(sink, &frame);
}

/// Hand one frame to the sink. Write errors are logged and dropped.
pub fn emit<S: TraceSink + ?Sized>(sink: &Mutex<S>, frame: &CallFrame) {
    if let Err(err) = sink.lock().record(frame) {
        warn!(error = %err, call = %frame.name, "trace sink write failed");
    }
}
