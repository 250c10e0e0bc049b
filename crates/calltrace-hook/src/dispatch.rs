//! Host dispatch table.
//!
//! An interpreter executes every call through one of two entry points: one
//! for interpreted code and one for native built-ins. Hosts expose both as
//! replaceable slots so that a hook can install a wrapper in front of them
//! and later put the originals back.

use std::sync::Arc;

use calltrace_frame::ExecutionContext;

/// Types of one host interpreter.
pub trait Runtime: 'static {
    /// Per-call execution context handed to the dispatch entry points.
    type Context: ExecutionContext + 'static;
    /// Extra call data passed to native dispatch.
    type CallInfo: 'static;
    /// Result of executing one call, errors included.
    type Output: 'static;
}

/// Interpreted-code dispatch entry point.
pub type ExecuteFn<R> =
    Arc<dyn Fn(&<R as Runtime>::Context) -> <R as Runtime>::Output + Send + Sync>;

/// Native dispatch entry point.
pub type InternalFn<R> = Arc<
    dyn Fn(&<R as Runtime>::Context, &mut <R as Runtime>::CallInfo) -> <R as Runtime>::Output
        + Send
        + Sync,
>;

/// The host's replaceable dispatch entry points.
pub trait DispatchTable<R: Runtime> {
    /// Current interpreted dispatch.
    fn execute_ex(&self) -> ExecuteFn<R>;

    fn set_execute_ex(&mut self, execute: ExecuteFn<R>);

    /// Current native dispatch override, `None` when the host's built-in
    /// primitive is used directly.
    fn execute_internal(&self) -> Option<InternalFn<R>>;

    fn set_execute_internal(&mut self, execute: Option<InternalFn<R>>);

    /// The host's built-in native dispatch primitive.
    fn default_internal(&self) -> InternalFn<R>;
}

/// Entry points captured from a [`DispatchTable`].
pub struct SavedDispatch<R: Runtime> {
    pub execute_ex: ExecuteFn<R>,
    pub execute_internal: Option<InternalFn<R>>,
}

impl<R: Runtime> SavedDispatch<R> {
    /// Snapshot the table's current entry points.
    #[must_use]
    pub fn capture<T: DispatchTable<R> + ?Sized>(table: &T) -> Self {
        Self {
            execute_ex: table.execute_ex(),
            execute_internal: table.execute_internal(),
        }
    }

    /// Write the snapshot back into `table`.
    pub fn restore<T: DispatchTable<R> + ?Sized>(&self, table: &mut T) {
        table.set_execute_ex(Arc::clone(&self.execute_ex));
        table.set_execute_internal(self.execute_internal.clone());
    }

    /// Whether `table` currently holds exactly these entry points.
    #[must_use]
    pub fn is_installed_in<T: DispatchTable<R> + ?Sized>(&self, table: &T) -> bool {
        let internal_matches = match (&self.execute_internal, table.execute_internal()) {
            (Some(saved), Some(current)) => Arc::ptr_eq(saved, &current),
            (None, None) => true,
            _ => false,
        };
        Arc::ptr_eq(&self.execute_ex, &table.execute_ex()) && internal_matches
    }
}

impl<R: Runtime> Clone for SavedDispatch<R> {
    fn clone(&self) -> Self {
        Self {
            execute_ex: Arc::clone(&self.execute_ex),
            execute_internal: self.execute_internal.clone(),
        }
    }
}
