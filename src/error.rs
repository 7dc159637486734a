//! Error types for the Arrow interpreter.
//!
//! Every error carries the stage it occurred in, a human message, and the
//! token it occurred on, so the driver can point at the offending source.
//! Errors are never caught inside the core; they propagate to the driver,
//! which renders them and exits. The internal return signal used by `exit`
//! statements is *not* an error — see [`crate::evaluator::Flow`].

use crate::scanner::Token;
use colored::Colorize;
use std::fmt;

/// The interpreter stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    Parsing,
    Evaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanning => "scanning",
            Stage::Parsing => "parsing",
            Stage::Evaluation => "evaluation",
        };
        write!(f, "{}", name)
    }
}

/// The closed set of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unrecognized symbol in the source text.
    Scanning,
    /// Grammar violation.
    Parsing,
    /// Unknown variable, attribute, or function name.
    NotFound,
    /// Assignment to a constant binding.
    WriteConst,
    /// Array index that is not a whole in-bounds non-negative number.
    BadIndex,
    /// Zero denominator required.
    DivByZero,
    /// A `==` deallocation whose variable held the wrong value.
    ConditionViolation,
    /// The inverter was handed a shape it has no rule for.
    InverseNotDefined,
    /// Argument count differs from the parameter list.
    ArityMismatch,
    /// Operand of the wrong type.
    TypeMismatch,
}

impl ErrorKind {
    pub fn stage(&self) -> Stage {
        match self {
            ErrorKind::Scanning => Stage::Scanning,
            ErrorKind::Parsing => Stage::Parsing,
            _ => Stage::Evaluation,
        }
    }
}

/// An error at a known source position.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowError {
    pub kind: ErrorKind,
    pub message: String,
    pub token: Token,
}

impl ArrowError {
    pub fn scanning(message: impl Into<String>, token: Token) -> Self {
        ArrowError {
            kind: ErrorKind::Scanning,
            message: message.into(),
            token,
        }
    }

    pub fn parsing(message: impl Into<String>, token: Token) -> Self {
        ArrowError {
            kind: ErrorKind::Parsing,
            message: message.into(),
            token,
        }
    }

    pub fn eval(kind: ErrorKind, message: impl Into<String>, token: &Token) -> Self {
        ArrowError {
            kind,
            message: message.into(),
            token: token.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }
}

impl fmt::Display for ArrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error at line {}: {}",
            self.stage(),
            self.token.line,
            self.message
        )
    }
}

impl std::error::Error for ArrowError {}

/// An evaluation failure that has not yet been anchored to a token.
/// Produced by memory lookups and builtin method bodies, which do not
/// know which AST node asked for them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RawError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RawError {
            kind,
            message: message.into(),
        }
    }

    /// Anchor this error to the token being evaluated.
    pub fn at(self, token: &Token) -> ArrowError {
        ArrowError {
            kind: self.kind,
            message: self.message,
            token: token.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArrowError>;

/// Render a three-line window around the offending line, with a caret
/// under the token, in the style the driver prints before exiting.
pub fn source_window(error: &ArrowError, filename: &str, code: &[String]) -> String {
    let line_num = error.token.line;
    let blank = String::new();
    let prev = if line_num > 0 {
        code.get(line_num - 1).unwrap_or(&blank)
    } else {
        &blank
    };
    let line = code.get(line_num).unwrap_or(&blank);
    let next = code.get(line_num + 1).unwrap_or(&blank);

    let tab = " ".repeat(4);
    let header = "-".repeat(prev.len().max(line.len()).max(next.len()) + tab.len() + 4);

    let mut out = String::new();
    out.push_str(&format!(
        "Error occurred in file '{}' on line {} during {}.\n",
        filename,
        line_num,
        error.stage()
    ));
    out.push('\n');
    out.push_str(&header);
    out.push('\n');
    if line_num > 0 {
        out.push_str(&format!("{}{}{}\n", line_num - 1, tab, prev));
    }
    out.push_str(&format!("{}{}{}\n", line_num, tab, line));

    // Caret position = how far along the line the token is + preamble.
    let offset = line_num.to_string().len() + tab.len();
    out.push_str(&" ".repeat(error.token.col + offset));
    out.push_str(&format!("{}\n", "^".red()));

    out.push_str(&format!("{}{}{}\n", line_num + 1, tab, next));
    out.push_str(&header);
    out.push('\n');
    out.push('\n');
    out.push_str(&error.message);
    out.push('\n');
    out
}
