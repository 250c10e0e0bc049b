//! Reference interpreter for call scripts.
//!
//! `Engine` executes a [`Script`] the way a bytecode interpreter dispatches
//! calls: every interpreted call goes through the current `execute_ex`
//! entry point with a freshly pushed context, every built-in through the
//! native entry point with the caller's context. A caller context records
//! the call it is dispatching (callee, receiver, call-site line), which is
//! what the classifier reads back.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use calltrace_frame::{ExecutionContext, FunctionRef, OpLine, SyntheticOp};
use calltrace_hook::{DispatchTable, ExecuteFn, InternalFn, Runtime};
use thiserror::Error;
use tracing::trace;

use crate::script::{NativeCall, Op, Script, Stmt, UserCall};

/// Errors raised by running scripts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("uncaught error: {message} in {file}:{line}")]
    Thrown {
        message: String,
        file: String,
        line: u32,
    },
}

/// Runtime types of the reference engine.
pub struct Sim;

impl Runtime for Sim {
    type Context = Frame;
    type CallInfo = ();
    type Output = Result<(), RuntimeError>;
}

/// A compiled code unit: function body, included file, evaluated string,
/// entry script, or a built-in (no file, no body).
#[derive(Debug)]
struct Code {
    name: Option<String>,
    scope: Option<String>,
    filename: Option<String>,
    line_start: u32,
    line_end: u32,
    body: Rc<[Stmt]>,
}

impl Code {
    fn unit(filename: String, body: Rc<[Stmt]>) -> Self {
        let line_start = body.first().map_or(0, |stmt| stmt.line);
        let line_end = body.last().map_or(line_start, last_line);
        Self {
            name: None,
            scope: None,
            filename: Some(filename),
            line_start,
            line_end,
            body,
        }
    }

    fn native(call: &NativeCall) -> Self {
        Self {
            name: Some(call.name.clone()),
            scope: call.scope.clone(),
            filename: None,
            line_start: 0,
            line_end: 0,
            body: Rc::from(Vec::new()),
        }
    }

    fn as_function(&self) -> FunctionRef<'_> {
        FunctionRef {
            name: self.name.as_deref(),
            scope: self.scope.as_deref(),
            filename: self.filename.as_deref(),
            line_start: self.line_start,
            line_end: self.line_end,
        }
    }

    fn entry_line(&self) -> Option<OpLine> {
        self.body
            .first()
            .map(|stmt| OpLine::at(stmt.line))
            .or_else(|| (self.line_start > 0).then(|| OpLine::at(self.line_start)))
    }
}

struct Slots {
    execute_ex: ExecuteFn<Sim>,
    execute_internal: Option<InternalFn<Sim>>,
    default_internal: InternalFn<Sim>,
}

/// Execution context of the reference engine.
#[derive(Clone)]
pub struct Frame {
    prev: Option<Rc<Frame>>,
    /// Call being dispatched from this frame.
    function: Option<Rc<Code>>,
    receiver: bool,
    /// Code this frame executes.
    unit: Rc<Code>,
    opline: Option<OpLine>,
    slots: Rc<RefCell<Slots>>,
}

impl ExecutionContext for Frame {
    fn previous(&self) -> Option<&Self> {
        self.prev.as_deref()
    }

    fn opline(&self) -> Option<OpLine> {
        self.opline
    }

    fn function(&self) -> Option<FunctionRef<'_>> {
        self.function.as_deref().map(Code::as_function)
    }

    fn filename(&self) -> Option<&str> {
        self.unit.filename.as_deref()
    }

    fn has_receiver(&self) -> bool {
        self.receiver
    }
}

impl Frame {
    fn file(&self) -> &str {
        self.unit.filename.as_deref().unwrap_or_default()
    }

    /// This frame, positioned at `line` and dispatching `function`.
    fn call_site(&self, line: u32, extended: u32, function: Rc<Code>, receiver: bool) -> Self {
        Self {
            function: Some(function),
            receiver,
            opline: Some(OpLine::new(line, extended)),
            ..self.clone()
        }
    }

    fn step(&self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match &stmt.op {
            Op::User(call) => {
                let code = self.user_code(call, stmt);
                self.dispatch(stmt.line, 0, code, call.receiver)
            }
            Op::Include(op, file) => {
                let code = Code::unit(file.clone(), Rc::clone(&stmt.body));
                self.dispatch(stmt.line, op.code(), code, false)
            }
            Op::Eval => {
                let name = format!("{}({}) : eval()'d code", self.file(), stmt.line);
                let code = Code::unit(name, Rc::clone(&stmt.body));
                self.dispatch(stmt.line, SyntheticOp::Eval.code(), code, false)
            }
            Op::Native(call) => {
                let site = self.call_site(stmt.line, 0, Rc::new(Code::native(call)), call.receiver);
                let execute = {
                    let slots = self.slots.borrow();
                    slots
                        .execute_internal
                        .clone()
                        .unwrap_or_else(|| Arc::clone(&slots.default_internal))
                };
                execute(&site, &mut ())
            }
            Op::Throw(message) => Err(RuntimeError::Thrown {
                message: message.clone(),
                file: self.file().to_owned(),
                line: stmt.line,
            }),
        }
    }

    fn user_code(&self, call: &UserCall, stmt: &Stmt) -> Code {
        let (filename, line_start, line_end) = match &call.source {
            Some(span) => {
                let start = span.start.unwrap_or(stmt.line);
                (span.file.clone(), start, span.end.unwrap_or(start))
            }
            None => (self.file().to_owned(), stmt.line, last_line(stmt)),
        };
        Code {
            name: Some(call.name.clone()),
            scope: call.scope.clone(),
            filename: Some(filename),
            line_start,
            line_end,
            body: Rc::clone(&stmt.body),
        }
    }

    /// Push a context for `code` and run it through `execute_ex`.
    fn dispatch(&self, line: u32, extended: u32, code: Code, receiver: bool) -> Result<(), RuntimeError> {
        let code = Rc::new(code);
        let caller = self.call_site(line, extended, Rc::clone(&code), receiver);
        let callee = Self {
            prev: Some(Rc::new(caller)),
            function: Some(Rc::clone(&code)),
            receiver,
            opline: code.entry_line(),
            unit: code,
            slots: Rc::clone(&self.slots),
        };
        let execute = Arc::clone(&self.slots.borrow().execute_ex);
        execute(&callee)
    }
}

/// Line of the last statement nested anywhere under `stmt`.
fn last_line(stmt: &Stmt) -> u32 {
    stmt.body.last().map_or(stmt.line, last_line)
}

/// Built-in interpreted dispatch: run the frame's statements in order.
fn execute(frame: &Frame) -> Result<(), RuntimeError> {
    trace!(file = frame.file(), "executing unit");
    for stmt in frame.unit.body.iter() {
        frame.step(stmt)?;
    }
    Ok(())
}

/// Built-in native dispatch. Built-ins have no observable body here.
fn execute_internal(frame: &Frame, _args: &mut ()) -> Result<(), RuntimeError> {
    trace!(
        function = frame.function.as_deref().and_then(|code| code.name.as_deref()),
        "native call"
    );
    Ok(())
}

/// The reference interpreter.
pub struct Engine {
    slots: Rc<RefCell<Slots>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        let slots = Slots {
            execute_ex: Arc::new(execute),
            execute_internal: None,
            default_internal: Arc::new(execute_internal),
        };
        Self {
            slots: Rc::new(RefCell::new(slots)),
        }
    }

    /// Run `script` from its entry point.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by the script.
    pub fn run(&self, script: &Script) -> Result<(), RuntimeError> {
        let unit = Rc::new(Code::unit(script.file.clone(), Rc::clone(&script.body)));
        let main = Frame {
            prev: None,
            function: Some(Rc::clone(&unit)),
            receiver: false,
            opline: unit.entry_line(),
            unit,
            slots: Rc::clone(&self.slots),
        };
        let execute = Arc::clone(&self.slots.borrow().execute_ex);
        execute(&main)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable<Sim> for Engine {
    fn execute_ex(&self) -> ExecuteFn<Sim> {
        Arc::clone(&self.slots.borrow().execute_ex)
    }

    fn set_execute_ex(&mut self, execute: ExecuteFn<Sim>) {
        self.slots.borrow_mut().execute_ex = execute;
    }

    fn execute_internal(&self) -> Option<InternalFn<Sim>> {
        self.slots.borrow().execute_internal.clone()
    }

    fn set_execute_internal(&mut self, execute: Option<InternalFn<Sim>>) {
        self.slots.borrow_mut().execute_internal = execute;
    }

    fn default_internal(&self) -> InternalFn<Sim> {
        Arc::clone(&self.slots.borrow().default_internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calltrace_hook::{Interceptor, MemorySink, TraceConfig};

    fn traced(text: &str) -> (Vec<String>, Result<(), RuntimeError>) {
        let script = Script::parse(text).unwrap();
        let mut engine = Engine::new();
        let mut hook: Interceptor<Sim, MemorySink> =
            Interceptor::new(TraceConfig::enabled(), MemorySink::new());
        hook.activate(&mut engine).unwrap();
        let result = engine.run(&script);
        hook.deactivate(&mut engine);
        let lines = hook.sink().lock().lines();
        (lines, result)
    }

    #[test]
    fn test_untraced_run() {
        let script = Script::parse("1: call f\n  2: throw nope\n").unwrap();
        let err = Engine::new().run(&script).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Thrown {
                message: "nope".to_owned(),
                file: "main".to_owned(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_main_and_plain_calls() {
        let (lines, result) = traced("file index.php\n3: call a\n  5: call b\n4: call c\n");
        result.unwrap();
        assert_eq!(
            lines,
            vec![
                "[index.php:3] {main}()",
                "[index.php:3] a()",
                "[index.php:5] b()",
                "[index.php:4] c()",
            ]
        );
    }

    #[test]
    fn test_calls_from_function_body_use_its_file() {
        let (lines, _) = traced("file m.php\n1: call lib @ lib.php:20-30\n  21: call inner\n");
        assert_eq!(lines[2], "[lib.php:21] inner()");
    }

    #[test]
    fn test_method_kinds() {
        let (lines, _) = traced(
            "file m.php\n1: method Cart add\n2: static Cart make\n3: native Cart->count\n4: native Cart::reset\n",
        );
        assert_eq!(
            &lines[1..],
            [
                "[m.php:1] Cart->add()",
                "[m.php:2] Cart::make()",
                "[m.php:3] Cart->count()",
                "[m.php:4] Cart::reset()",
            ]
        );
    }

    #[test]
    fn test_native_call_is_internal() {
        let script = Script::parse("1: native strlen\n").unwrap();
        let mut engine = Engine::new();
        let mut hook: Interceptor<Sim, MemorySink> =
            Interceptor::new(TraceConfig::enabled(), MemorySink::new());
        hook.activate(&mut engine).unwrap();
        engine.run(&script).unwrap();

        let sink = hook.sink().lock();
        let frames = &sink.frames;
        assert!(!frames[0].internal);
        assert!(frames[1].internal);
        assert_eq!(frames[1].to_string(), "[main:1] strlen()");
    }

    #[test]
    fn test_synthetic_calls() {
        let (lines, _) = traced(
            "file m.php\n\
             1: include inc.php\n\
             \x20 7: call helper\n\
             2: eval\n\
             \x20 1: native var_dump\n\
             3: require_once conf.php\n",
        );
        assert_eq!(
            lines,
            vec![
                "[m.php:1] {main}()",
                "[m.php:1] {include:inc.php}",
                "[inc.php:7] helper()",
                "[m.php:2] {eval}",
                "[m.php(2) : eval()'d code:1] var_dump()",
                "[m.php:3] {require_once:conf.php}",
            ]
        );
    }

    #[test]
    fn test_closure_span_defaults_to_body() {
        let (lines, _) = traced("file m.php\n4: closure\n  5: lambda\n  6: call x\n");
        assert_eq!(lines[1], "[m.php:4] {closure:m.php:4-6}()");
        assert_eq!(lines[2], "[m.php:5] {lambda:m.php}()");
    }

    #[test]
    fn test_closure_span_covers_nested_body() {
        let (lines, _) = traced("file m.php\n4: closure\n  5: call a\n    9: call b\n");
        assert_eq!(lines[1], "[m.php:4] {closure:m.php:4-9}()");
        assert_eq!(lines[2], "[m.php:5] a()");
        assert_eq!(lines[3], "[m.php:9] b()");
    }

    #[test]
    fn test_error_propagates_through_wrappers() {
        let (lines, result) = traced("file m.php\n1: call risky\n  3: throw oops\n2: call never\n");
        assert_eq!(
            result,
            Err(RuntimeError::Thrown {
                message: "oops".to_owned(),
                file: "m.php".to_owned(),
                line: 3,
            })
        );
        assert_eq!(lines, vec!["[m.php:1] {main}()", "[m.php:1] risky()"]);
    }

    #[test]
    fn test_deactivated_engine_no_longer_traces() {
        let script = Script::parse("1: call f\n").unwrap();
        let mut engine = Engine::new();
        let mut hook: Interceptor<Sim, MemorySink> =
            Interceptor::new(TraceConfig::enabled(), MemorySink::new());
        hook.activate(&mut engine).unwrap();
        engine.run(&script).unwrap();
        hook.deactivate(&mut engine);
        engine.run(&script).unwrap();

        assert_eq!(hook.sink().lock().frames.len(), 2);
        assert!(engine.execute_internal().is_none());
    }
}
