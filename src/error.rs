// SPDX-License-Identifier: GPL-2.0-only

//
// Diagnostics and error types
//

use crate::lex::Position;
use std::fmt::{Display,Formatter};
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Display for Severity {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error   => write!(fmt, "error"),
            Severity::Warning => write!(fmt, "warning"),
            Severity::Note    => write!(fmt, "note"),
        }
    }
}

/// A positioned message produced by one of the compiler stages
#[derive(Clone,Debug,PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub pos: Position,
}

impl Diagnostic {
    pub fn error(pos: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic { severity: Severity::Error, message: message.into(), pos: pos }
    }

    pub fn warning(pos: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic { severity: Severity::Warning, message: message.into(), pos: pos }
    }

    pub fn note(pos: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic { severity: Severity::Note, message: message.into(), pos: pos }
    }

    /// Render as `file:line:col: severity: message` followed by the source line and a caret
    pub fn render(&self, file: &str, source: &str, colour: bool) -> String {
        let (bold, reset, tint) = if colour {
            let tint = match self.severity {
                Severity::Error   => "\x1b[1;31m",
                Severity::Warning => "\x1b[1;35m",
                Severity::Note    => "\x1b[1;36m",
            };
            ("\x1b[1m", "\x1b[0m", tint)
        } else {
            ("", "", "")
        };

        let mut out = format!("{}{}:{}:{}: {}{}:{} {}{}\n",
            bold, file, self.pos.line, self.pos.column,
            tint, self.severity, reset, self.message, reset);
        // Diagnostics without a real position have line 0
        if let Some(line) = self.pos.line.checked_sub(1).and_then(|n| source.lines().nth(n)) {
            let pad: String = line.chars()
                .take(self.pos.column.saturating_sub(1))
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();
            out.push_str(&format!("{}\n{}{}^{}\n", line, pad, tint, reset));
        }
        out
    }
}

/// Diagnostics of one compilation unit
#[derive(Debug,Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
    // Escalate warnings to errors (-Werror)
    werror: bool,
}

impl Diagnostics {
    pub fn new(werror: bool) -> Diagnostics {
        Diagnostics {
            list: Vec::new(),
            werror: werror,
        }
    }

    pub fn push(&mut self, mut diag: Diagnostic) {
        if self.werror && diag.severity == Severity::Warning {
            diag.severity = Severity::Error;
        }
        self.list.push(diag);
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.push(diag);
        }
    }

    fn count(&self, severity: Severity) -> usize {
        self.list.iter().filter(|d| d.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn note_count(&self) -> usize {
        self.count(Severity::Note)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.list.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Tally line printed after the rendered diagnostics
    pub fn summary(&self) -> String {
        fn plural(count: usize, what: &str) -> String {
            format!("{} {}{}", count, what, if count == 1 { "" } else { "s" })
        }
        format!("{}, {} and {} generated.",
            plural(self.error_count(), "error"),
            plural(self.warning_count(), "warning"),
            plural(self.note_count(), "note"))
    }
}

//
// Parse errors, fatal to the current compilation unit
//

#[derive(Clone,Debug,Error,PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String, pos: Position },

    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: String, pos: Position },

    #[error("redefinition of '{name}' (previous definition at {}:{})", .original.line, .original.column)]
    Redefinition { name: Rc<str>, pos: Position, original: Position },

    #[error("use of undeclared identifier '{name}'")]
    Undeclared { name: Rc<str>, pos: Position },

    #[error("missing default argument on parameter '{name}'")]
    MissingDefault { name: Rc<str>, pos: Position },

    #[error("unknown type name '{name}'")]
    UnknownType { name: Rc<str>, pos: Position },

    #[error("member reference base '{name}' is not a structure")]
    NotAStructure { name: Rc<str>, pos: Position },

    #[error("no member named '{member}' in '{aggregate}'")]
    NoMember { member: Rc<str>, aggregate: Rc<str>, pos: Position },

    #[error("'else' without a previous 'if'")]
    ElseWithoutIf { pos: Position },

    #[error("expression is not assignable")]
    NotAssignable { pos: Position },

    #[error("invalid constant expression: {reason}")]
    Constant { reason: EvalError, pos: Position },

    #[error("void function should not return a value")]
    ReturnValueInVoid { pos: Position },

    #[error("non-void function '{name}' should return a value")]
    MissingReturnValue { name: Rc<str>, pos: Position },
}

impl ParseError {
    pub fn pos(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { pos, .. } |
            ParseError::UnexpectedEof { pos, .. } |
            ParseError::Redefinition { pos, .. } |
            ParseError::Undeclared { pos, .. } |
            ParseError::MissingDefault { pos, .. } |
            ParseError::UnknownType { pos, .. } |
            ParseError::NotAStructure { pos, .. } |
            ParseError::NoMember { pos, .. } |
            ParseError::ElseWithoutIf { pos } |
            ParseError::NotAssignable { pos } |
            ParseError::Constant { pos, .. } |
            ParseError::ReturnValueInVoid { pos } |
            ParseError::MissingReturnValue { pos, .. } => *pos,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Diagnostic {
        Diagnostic::error(err.pos(), err.to_string())
    }
}

/// Failure to fold a constant expression
#[derive(Clone,Debug,Error,PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("malformed literal '{0}'")]
    Malformed(String),
    #[error("expression is not constant")]
    NotConstant,
}

//
// Lowering failures: these indicate unhandled constructs or broken invariants
//

#[derive(Clone,Debug,Error,PartialEq)]
pub enum LowerError {
    #[error("identifier '{0}' has no storage in any block")]
    UnknownIdentifier(Rc<str>),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("not reachable: {0}")]
    NotReachable(String),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

//
// Code generation failures
//

#[derive(Clone,Debug,Error,PartialEq)]
pub enum GenError {
    #[error("No entry point 'main'")]
    NoEntryPoint,
    #[error("use of undeclared identifier '{0}'")]
    Undeclared(Rc<str>),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("not reachable: {0}")]
    NotReachable(String),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Errors surfaced to the driver
#[derive(Debug,Error)]
pub enum Error {
    #[error("compilation aborted with {0} error(s)")]
    Aborted(usize),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("internal error while lowering: {0}")]
    Lower(#[from] LowerError),
    #[error(transparent)]
    Gen(#[from] GenError),
    #[error("{path}: {source}")]
    Io { path: String, source: std::io::Error },
}
