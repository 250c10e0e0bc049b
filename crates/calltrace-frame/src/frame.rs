//! Call frame descriptors and the classifier that builds them.

use std::fmt;

use crate::context::{ExecutionContext, FunctionRef, OpLine};
use crate::kind::{CallKind, SyntheticOp};

/// Declared name the interpreter gives to closures.
pub const CLOSURE_MARKER: &str = "{closure}";
/// Declared name the interpreter gives to anonymous lambdas.
pub const LAMBDA_MARKER: &str = "__lambda_func";
/// Display name of the top-level entry point.
pub const MAIN_NAME: &str = "{main}";
/// Display name of a dynamic evaluation.
pub const EVAL_NAME: &str = "{eval}";
/// Rendering of a missing string.
pub const NULL_DISPLAY: &str = "(null)";

/// Descriptor of one intercepted call.
///
/// All strings are owned copies; the context a frame was captured from may
/// be gone by the time the frame is emitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallFrame {
    /// Native (built-in) dispatch.
    pub internal: bool,
    pub kind: CallKind,
    /// Owning type name. Set only for `Member` and `Static`.
    pub owner: Option<String>,
    /// Display name of the callee, possibly a `{...}` composite.
    pub name: String,
    pub source_file: Option<String>,
    /// Call-site line, 0 when unknown.
    pub source_line: u32,
    /// Raw extended code of the call site, 0 when absent.
    pub extended_value: u32,
}

impl CallFrame {
    /// Classify the call `current` is about to run.
    ///
    /// For interpreted calls the caller's context (when there is one) is the
    /// reference for naming and location: `current` already describes the
    /// callee's body. Native calls are not pushed as frames of their own, so
    /// `current` is used as is.
    #[must_use]
    pub fn capture<C: ExecutionContext + ?Sized>(current: &C, internal: bool) -> Self {
        let reference = if internal {
            current
        } else {
            current.previous().unwrap_or(current)
        };
        let ref_opline = reference.opline();

        let named = reference
            .function()
            .and_then(|function| function.name.map(|name| (function, name)));
        let (kind, owner, name) = match named {
            Some((function, name)) => classify_named(reference, function, name),
            None => classify_synthetic(current, ref_opline),
        };

        let source_line = ref_opline
            .or_else(|| current.opline())
            .map_or(0, |op| op.lineno);
        let source_file = reference
            .filename()
            .or_else(|| current.filename())
            .map(str::to_owned);

        Self {
            internal,
            kind,
            owner,
            name,
            source_file,
            source_line,
            extended_value: ref_opline.map_or(0, |op| op.extended_value),
        }
    }

    /// `owner` is present exactly for `Member` and `Static` calls.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.owner.is_some() == self.kind.has_owner()
    }
}

/// Classify the call `current` is about to run; see [`CallFrame::capture`].
#[must_use]
pub fn classify<C: ExecutionContext + ?Sized>(current: &C, internal: bool) -> CallFrame {
    CallFrame::capture(current, internal)
}

fn classify_named<C: ExecutionContext + ?Sized>(
    reference: &C,
    function: FunctionRef<'_>,
    name: &str,
) -> (CallKind, Option<String>, String) {
    let (kind, owner) = match function.scope {
        Some(scope) if reference.has_receiver() => (CallKind::Member, Some(scope.to_owned())),
        Some(scope) => (CallKind::Static, Some(scope.to_owned())),
        None => (CallKind::Normal, None),
    };

    let name = match name {
        CLOSURE_MARKER => format!(
            "{{closure:{}:{}-{}}}",
            or_null(function.filename),
            function.line_start,
            function.line_end
        ),
        LAMBDA_MARKER => format!("{{lambda:{}}}", or_null(function.filename)),
        _ => name.to_owned(),
    };

    (kind, owner, name)
}

fn classify_synthetic<C: ExecutionContext + ?Sized>(
    current: &C,
    ref_opline: Option<OpLine>,
) -> (CallKind, Option<String>, String) {
    let op = ref_opline.and_then(|op| SyntheticOp::from_code(op.extended_value));
    match op {
        Some(SyntheticOp::Eval) => (CallKind::Eval, None, EVAL_NAME.to_owned()),
        // The included file is the callee's own unit.
        Some(op) => {
            let included = current.function().and_then(|function| function.filename);
            let name = format!("{{{}:{}}}", op.keyword(), or_null(included));
            (op.kind(), None, name)
        }
        None => (CallKind::Normal, None, MAIN_NAME.to_owned()),
    }
}

fn or_null(value: Option<&str>) -> &str {
    value.unwrap_or(NULL_DISPLAY)
}

impl fmt::Display for CallFrame {
    /// One trace line, without the trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] ",
            or_null(self.source_file.as_deref()),
            self.source_line
        )?;
        let owner = or_null(self.owner.as_deref());
        match self.kind {
            CallKind::Normal => write!(f, "{}()", self.name),
            CallKind::Member => write!(f, "{owner}->{}()", self.name),
            CallKind::Static => write!(f, "{owner}::{}()", self.name),
            kind if kind.is_synthetic() => f.write_str(&self.name),
            _ => write!(f, "unknown ev: {:x}", self.extended_value),
        }
    }
}
