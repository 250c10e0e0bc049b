//! Module lifecycle.
//!
//! The host's module manager loads the hook once per process: `startup`
//! before the first call is dispatched and `shutdown` after the last one has
//! returned. Configuration is fixed at construction; there is no support for
//! changing it while the module is running.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::TraceConfig;
use crate::dispatch::{DispatchTable, Runtime};
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::sink::TraceSink;

pub const MODULE_NAME: &str = "calltrace";
pub const MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    Loaded,
    Started,
    Stopped,
}

/// The call-trace hook packaged as a host module.
pub struct TraceModule<R: Runtime, S: TraceSink + 'static> {
    interceptor: Interceptor<R, S>,
    state: ModuleState,
}

impl<R: Runtime, S: TraceSink + 'static> TraceModule<R, S> {
    pub fn new(config: TraceConfig, sink: S) -> Self {
        Self::with_shared_sink(config, Arc::new(Mutex::new(sink)))
    }

    pub const fn with_shared_sink(config: TraceConfig, sink: Arc<Mutex<S>>) -> Self {
        Self {
            interceptor: Interceptor::with_shared_sink(config, sink),
            state: ModuleState::Loaded,
        }
    }

    pub const fn state(&self) -> ModuleState {
        self.state
    }

    pub const fn interceptor(&self) -> &Interceptor<R, S> {
        &self.interceptor
    }

    /// Module start: save the host's entry points and install the wrappers
    /// if tracing is enabled.
    ///
    /// # Errors
    ///
    /// Propagates [`Interceptor::activate`] errors.
    pub fn startup<T: DispatchTable<R> + ?Sized>(&mut self, table: &mut T) -> Result<()> {
        self.interceptor.activate(table)?;
        self.state = ModuleState::Started;
        debug!(
            module = MODULE_NAME,
            enabled = self.interceptor.config().enable,
            "module started"
        );
        Ok(())
    }

    /// Module stop: restore the host's entry points and flush the sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's flush error. The entry points are restored first
    /// regardless.
    pub fn shutdown<T: DispatchTable<R> + ?Sized>(&mut self, table: &mut T) -> Result<()> {
        self.interceptor.deactivate(table);
        self.state = ModuleState::Stopped;
        self.interceptor.sink().lock().flush()?;
        debug!(module = MODULE_NAME, "module stopped");
        Ok(())
    }

    /// Module information table.
    pub fn info(&self) -> ModuleInfo {
        ModuleInfo::new(self.interceptor.config())
    }
}

/// Module information as shown by the host's diagnostics page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub directives: Vec<(&'static str, String)>,
}

impl ModuleInfo {
    #[must_use]
    pub fn new(config: TraceConfig) -> Self {
        Self {
            name: MODULE_NAME,
            version: MODULE_VERSION,
            directives: config.entries(),
        }
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} support => enabled", self.name)?;
        writeln!(f, "version => {}", self.version)?;
        writeln!(f)?;
        writeln!(f, "Directive => Value")?;
        for (directive, value) in &self.directives {
            writeln!(f, "{directive} => {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ExecuteFn, InternalFn};
    use crate::sink::MemorySink;
    use calltrace_frame::{ExecutionContext, FunctionRef, OpLine};

    struct Ctx;

    impl ExecutionContext for Ctx {
        fn previous(&self) -> Option<&Self> {
            None
        }

        fn opline(&self) -> Option<OpLine> {
            Some(OpLine::at(1))
        }

        fn function(&self) -> Option<FunctionRef<'_>> {
            Some(FunctionRef::unit("main.php"))
        }

        fn filename(&self) -> Option<&str> {
            Some("main.php")
        }

        fn has_receiver(&self) -> bool {
            false
        }
    }

    struct Host;

    impl Runtime for Host {
        type Context = Ctx;
        type CallInfo = ();
        type Output = ();
    }

    struct Table {
        execute_ex: ExecuteFn<Host>,
        execute_internal: Option<InternalFn<Host>>,
    }

    impl DispatchTable<Host> for Table {
        fn execute_ex(&self) -> ExecuteFn<Host> {
            Arc::clone(&self.execute_ex)
        }

        fn set_execute_ex(&mut self, execute: ExecuteFn<Host>) {
            self.execute_ex = execute;
        }

        fn execute_internal(&self) -> Option<InternalFn<Host>> {
            self.execute_internal.clone()
        }

        fn set_execute_internal(&mut self, execute: Option<InternalFn<Host>>) {
            self.execute_internal = execute;
        }

        fn default_internal(&self) -> InternalFn<Host> {
            Arc::new(|_: &Ctx, _: &mut ()| {})
        }
    }

    fn table() -> Table {
        Table {
            execute_ex: Arc::new(|_: &Ctx| {}),
            execute_internal: None,
        }
    }

    #[test]
    fn test_lifecycle_order() {
        let mut table = table();
        let original = table.execute_ex();
        let mut module: TraceModule<Host, MemorySink> =
            TraceModule::new(TraceConfig::enabled(), MemorySink::new());
        assert_eq!(module.state(), ModuleState::Loaded);

        module.startup(&mut table).unwrap();
        assert_eq!(module.state(), ModuleState::Started);
        (table.execute_ex())(&Ctx);

        module.shutdown(&mut table).unwrap();
        assert_eq!(module.state(), ModuleState::Stopped);
        assert!(Arc::ptr_eq(&original, &table.execute_ex()));
        assert_eq!(
            module.interceptor().sink().lock().lines(),
            vec!["[main.php:1] {main}()"]
        );
    }

    #[test]
    fn test_info_table() {
        let module: TraceModule<Host, MemorySink> =
            TraceModule::new(TraceConfig::enabled(), MemorySink::new());
        let info = module.info();

        assert_eq!(info.name, "calltrace");
        let rendered = info.to_string();
        assert!(rendered.starts_with("calltrace support => enabled\n"));
        assert!(rendered.contains("calltrace.enable => 1\n"));
    }

    #[test]
    fn test_disabled_module_info_still_lists_directive() {
        let info = ModuleInfo::new(TraceConfig::disabled());
        assert!(info.to_string().contains("calltrace.enable => 0"));
    }
}
