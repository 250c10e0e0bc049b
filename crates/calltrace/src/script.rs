//! Call scripts for the reference engine.
//!
//! A script is a tree of calls. Each line is `<line>: <statement>`, where
//! `<line>` is the source line the call is made from; statements indented
//! deeper than the one before them form its body.
//!
//! ```text
//! file main.php
//! 2: call greet @ lib.php:10-14
//!   11: native strlen
//!   12: method Greeter hello
//! 3: include_once inc.php
//!   2: call helper
//! 4: eval
//! ```

use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::vec;

use calltrace_frame::{SyntheticOp, CLOSURE_MARKER, LAMBDA_MARKER};
use thiserror::Error;

/// Entry file used when a script has no `file` directive.
pub const DEFAULT_ENTRY_FILE: &str = "main";

/// Script loading errors.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ScriptError {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Source span of a user function body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// Call into interpreted code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCall {
    /// Declared name (closures and lambdas use the interpreter's markers).
    pub name: String,
    pub scope: Option<String>,
    pub receiver: bool,
    pub source: Option<SourceSpan>,
}

/// Call into a built-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeCall {
    pub name: String,
    pub scope: Option<String>,
    pub receiver: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    User(UserCall),
    Native(NativeCall),
    /// File inclusion; the body runs in the included file.
    Include(SyntheticOp, String),
    /// Dynamic evaluation; the body is the evaluated code.
    Eval,
    /// Raise a runtime error.
    Throw(String),
}

impl Op {
    const fn takes_body(&self) -> bool {
        matches!(self, Self::User(_) | Self::Include(..) | Self::Eval)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    /// Source line the statement sits on.
    pub line: u32,
    pub op: Op,
    pub body: Rc<[Stmt]>,
}

/// A parsed script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Script {
    /// Entry file name.
    pub file: String,
    pub body: Rc<[Stmt]>,
}

impl Script {
    /// Read and parse a script file.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Io`] if the file cannot be read, or
    /// [`ScriptError::Parse`] for malformed lines.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse script text.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Parse`] with the 1-based script line of the
    /// first malformed statement.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut file = None;
        let mut lines = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let number = idx + 1;
            let content = raw.trim_end();
            let trimmed = content.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if content.contains('\t') {
                return Err(ScriptError::parse(number, "tabs are not allowed in indentation"));
            }
            let indent = content.len() - trimmed.len();

            if let Some(name) = trimmed.strip_prefix("file ") {
                if indent != 0 || file.is_some() || !lines.is_empty() {
                    return Err(ScriptError::parse(number, "`file` must be the first statement"));
                }
                file = Some(name.trim().to_owned());
                continue;
            }

            let (line, op) = parse_statement(number, trimmed)?;
            lines.push(Line {
                number,
                indent,
                line,
                op,
            });
        }

        let mut lines = lines.into_iter().peekable();
        let body = nest(&mut lines, 0)?;
        Ok(Self {
            file: file.unwrap_or_else(|| DEFAULT_ENTRY_FILE.to_owned()),
            body: body.into(),
        })
    }
}

struct Line {
    number: usize,
    indent: usize,
    line: u32,
    op: Op,
}

fn nest(lines: &mut Peekable<vec::IntoIter<Line>>, indent: usize) -> Result<Vec<Stmt>, ScriptError> {
    let mut stmts = Vec::new();
    while let Some(line) = lines.next_if(|next| next.indent >= indent) {
        if line.indent > indent {
            return Err(ScriptError::parse(line.number, "unexpected indentation"));
        }
        let body = match lines.peek() {
            Some(next) if next.indent > indent => {
                if !line.op.takes_body() {
                    return Err(ScriptError::parse(next.number, "statement cannot have a body"));
                }
                let child_indent = next.indent;
                nest(lines, child_indent)?
            }
            _ => Vec::new(),
        };
        stmts.push(Stmt {
            line: line.line,
            op: line.op,
            body: body.into(),
        });
    }
    Ok(stmts)
}

fn parse_statement(number: usize, text: &str) -> Result<(u32, Op), ScriptError> {
    let (line, stmt) = text
        .split_once(':')
        .ok_or_else(|| ScriptError::parse(number, "expected `<line>: <statement>`"))?;
    let line = line
        .trim()
        .parse::<u32>()
        .map_err(|_| ScriptError::parse(number, format!("invalid line number {:?}", line.trim())))?;

    let stmt = stmt.trim();
    let keyword = stmt.split_whitespace().next().unwrap_or_default();
    let (head, source) = match stmt.split_once(" @ ") {
        Some((head, source)) if USER_CALLS.contains(&keyword) => {
            (head.trim(), Some(parse_span(number, source.trim())?))
        }
        _ => (stmt, None),
    };
    let words: Vec<&str> = head.split_whitespace().collect();

    if let [keyword, file] = words.as_slice() {
        if let Some(op) = inclusion(keyword) {
            return Ok((line, Op::Include(op, (*file).to_owned())));
        }
    }

    let op = match words.as_slice() {
        ["call", name] => Op::User(user(name, None, false, source)),
        ["method", scope, name] => Op::User(user(name, Some(*scope), true, source)),
        ["static", scope, name] => Op::User(user(name, Some(*scope), false, source)),
        ["closure"] => Op::User(user(CLOSURE_MARKER, None, false, source)),
        ["lambda"] => Op::User(user(LAMBDA_MARKER, None, false, source)),
        ["native", target] => Op::Native(native(target)),
        ["eval"] => Op::Eval,
        ["throw", ..] => {
            let message = head.strip_prefix("throw").unwrap_or_default().trim();
            Op::Throw(message.to_owned())
        }
        _ => return Err(ScriptError::parse(number, format!("unknown statement {head:?}"))),
    };
    Ok((line, op))
}

/// Statements that may carry an ` @ FILE[:A[-B]]` source span.
const USER_CALLS: [&str; 5] = ["call", "method", "static", "closure", "lambda"];

fn user(name: &str, scope: Option<&str>, receiver: bool, source: Option<SourceSpan>) -> UserCall {
    UserCall {
        name: name.to_owned(),
        scope: scope.map(str::to_owned),
        receiver,
        source,
    }
}

/// `name`, `Type::name` or `Type->name`.
fn native(target: &str) -> NativeCall {
    let (scope, name, receiver) = if let Some((scope, name)) = target.split_once("->") {
        (Some(scope), name, true)
    } else if let Some((scope, name)) = target.split_once("::") {
        (Some(scope), name, false)
    } else {
        (None, target, false)
    };
    NativeCall {
        name: name.to_owned(),
        scope: scope.map(str::to_owned),
        receiver,
    }
}

fn inclusion(keyword: &str) -> Option<SyntheticOp> {
    match keyword {
        "include" => Some(SyntheticOp::Include),
        "include_once" => Some(SyntheticOp::IncludeOnce),
        "require" => Some(SyntheticOp::Require),
        "require_once" => Some(SyntheticOp::RequireOnce),
        _ => None,
    }
}

/// `FILE`, `FILE:START` or `FILE:START-END`.
fn parse_span(number: usize, text: &str) -> Result<SourceSpan, ScriptError> {
    let invalid = || ScriptError::parse(number, format!("invalid source span {text:?}"));
    let Some((file, range)) = text.rsplit_once(':') else {
        return Ok(SourceSpan {
            file: text.to_owned(),
            start: None,
            end: None,
        });
    };
    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (range, None),
    };
    let start = start.parse::<u32>().map_err(|_| invalid())?;
    let end = end
        .map(|end| end.parse::<u32>().map_err(|_| invalid()))
        .transpose()?;
    if file.is_empty() {
        return Err(invalid());
    }
    Ok(SourceSpan {
        file: file.to_owned(),
        start: Some(start),
        end,
    })
}
