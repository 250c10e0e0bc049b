//! Call frame classification for interpreter call tracing.
//!
//! Given a view of the interpreter's pending execution context, build a
//! [`CallFrame`] naming the callee, its owning type, the call kind and the
//! call-site location. Classification is pure and never fails: missing
//! metadata degrades to absent fields.
//!
//! ```ignore
//! use calltrace_frame::CallFrame;
//!
//! let frame = CallFrame::capture(&context, false);
//! eprintln!("{frame}");
//! ```

mod context;
mod frame;
mod kind;

pub use context::{ExecutionContext, FunctionRef, OpLine};
pub use frame::{
    CallFrame, classify, CLOSURE_MARKER, EVAL_NAME, LAMBDA_MARKER, MAIN_NAME, NULL_DISPLAY,
};
pub use kind::{CallKind, SyntheticOp, SYNTHETIC_BASE};
