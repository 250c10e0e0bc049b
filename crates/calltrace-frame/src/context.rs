//! Read-only view of interpreter execution state.
//!
//! The classifier never owns interpreter data. Hosts implement
//! [`ExecutionContext`] over their own frame type and hand a reference to the
//! hook for the duration of one dispatch.

/// Instruction pointer view: source line plus extended operation code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpLine {
    pub lineno: u32,
    pub extended_value: u32,
}

impl OpLine {
    #[must_use]
    pub const fn new(lineno: u32, extended_value: u32) -> Self {
        Self {
            lineno,
            extended_value,
        }
    }

    /// Plain instruction at `lineno` with no extended code.
    #[must_use]
    pub const fn at(lineno: u32) -> Self {
        Self::new(lineno, 0)
    }
}

/// Borrowed function descriptor.
///
/// `name` is `None` for code units without a declared callee: included
/// files, evaluated strings and the entry script. `filename` and the line
/// span describe the function's own body, not the call site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FunctionRef<'a> {
    pub name: Option<&'a str>,
    pub scope: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub line_start: u32,
    pub line_end: u32,
}

impl<'a> FunctionRef<'a> {
    /// Named function with no owning type.
    #[must_use]
    pub const fn named(name: &'a str) -> Self {
        Self {
            name: Some(name),
            scope: None,
            filename: None,
            line_start: 0,
            line_end: 0,
        }
    }

    /// Unnamed code unit backed by `filename`.
    #[must_use]
    pub const fn unit(filename: &'a str) -> Self {
        Self {
            name: None,
            scope: None,
            filename: Some(filename),
            line_start: 0,
            line_end: 0,
        }
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: &'a str) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub const fn with_source(mut self, filename: &'a str, line_start: u32, line_end: u32) -> Self {
        self.filename = Some(filename);
        self.line_start = line_start;
        self.line_end = line_end;
        self
    }
}

/// One in-flight call as seen by the interpreter.
///
/// A context describes the call it is *dispatching*: for a caller frame,
/// [`function`](Self::function) and [`has_receiver`](Self::has_receiver)
/// refer to the callee being invoked from it, while
/// [`opline`](Self::opline) and [`filename`](Self::filename) give the
/// caller's own position.
pub trait ExecutionContext {
    /// The caller's context, if any.
    fn previous(&self) -> Option<&Self>;

    /// Current instruction, if line tracking is available.
    fn opline(&self) -> Option<OpLine>;

    /// Function being dispatched by this context.
    fn function(&self) -> Option<FunctionRef<'_>>;

    /// File of the op-array this context executes.
    fn filename(&self) -> Option<&str>;

    /// Whether a receiver object is bound for the dispatched call.
    fn has_receiver(&self) -> bool;
}
