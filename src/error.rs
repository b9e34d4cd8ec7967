//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, preprocessor) convert
//! their internal failure modes into one of the variants defined here, so the
//! crate can share one `Result<T>` alias and interoperate with `anyhow` in the
//! binary.
//!
//! Positions are stored **0-indexed** and rendered 1-indexed:
//! `"<line+1>:<col+1>: <Kind>: <message>"`.
//!
//! The module **does not** print diagnostics itself; [`Diagnostics`] only
//! collects them for the driver.

use std::io;
use std::path::PathBuf;

use log::info;
use thiserror::Error;

use crate::preprocessor::SourceLine;
use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error.
    #[error("{}:{}: LoxSyntaxError: {message}", .line + 1, .col + 1)]
    Syntax {
        /// Human-readable description.
        message: String,

        /// 0-based line where the error occurred.
        line: usize,

        /// 0-based column where the error occurred.
        col: usize,
    },

    /// Syntactic (parser) error.
    #[error("{}:{}: LoxParseError: {message}", .line + 1, .col + 1)]
    Parse {
        message: String,
        line: usize,
        col: usize,
    },

    /// Static-analysis failure (scoping and context rules).
    #[error("{}:{}: LoxResolverError: {message}", .line + 1, .col + 1)]
    Resolve {
        message: String,
        line: usize,
        col: usize,
    },

    /// Runtime evaluation error.
    #[error("{}:{}: LoxRuntimeError: {message}", .line + 1, .col + 1)]
    Runtime {
        message: String,
        line: usize,
        col: usize,
    },

    /// An `include` directive that could not be satisfied.
    #[error("Include error: {message} ({})", .path.display())]
    Include { message: String, path: PathBuf },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn syntax<S: Into<String>>(line: usize, col: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Syntax error: {}:{} msg={}", line, col, message);

        LoxError::Syntax { message, line, col }
    }

    /// Helper constructor for the **parser**, positioned at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: {}:{} msg={}",
            token.start_line, token.start_col, message
        );

        LoxError::Parse {
            message,
            line: token.start_line,
            col: token.start_col,
        }
    }

    /// Helper constructor for the **resolver**, positioned at `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: {}:{} msg={}",
            token.start_line, token.start_col, message
        );

        LoxError::Resolve {
            message,
            line: token.start_line,
            col: token.start_col,
        }
    }

    /// Helper constructor for the **interpreter**, positioned at `token`.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: {}:{} msg={}",
            token.start_line, token.start_col, message
        );

        LoxError::Runtime {
            message,
            line: token.start_line,
            col: token.start_col,
        }
    }

    pub fn include<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        LoxError::Include {
            message: msg.into(),
            path: path.into(),
        }
    }

    /// `true` for errors raised while the program is executing.
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. })
    }

    /// The bare message without the position prefix, if this error carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            LoxError::Syntax { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Runtime { message, .. }
            | LoxError::Include { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Point the error at `origin`.  Errors inside included text name the
    /// include they came from.
    fn relocate(&mut self, origin: &SourceLine) {
        match self {
            LoxError::Syntax { message, line, .. }
            | LoxError::Parse { message, line, .. }
            | LoxError::Resolve { message, line, .. }
            | LoxError::Runtime { message, line, .. } => {
                *line = origin.line;
                if let Some(file) = &origin.file {
                    message.push_str(&format!(" (in {})", file.display()));
                }
            }
            _ => {}
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Accumulates every diagnostic produced by one `run`.
///
/// Replaces process-wide "had error" flags: the caller inspects the returned
/// value instead.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic, classifying it as static or runtime.
    pub fn report(&mut self, error: LoxError) {
        info!("Reporting diagnostic: {}", error);

        if error.is_runtime() {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = LoxError>) {
        for error in errors {
            self.report(error);
        }
    }

    /// Any scan, parse, resolve or include error so far.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }

    /// Rendered messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Map positions in preprocessed text back to the lines they were
    /// written on.  `origins` has one entry per preprocessed line.
    pub fn remap_lines(&mut self, origins: &[SourceLine]) {
        for error in &mut self.errors {
            let line = match error {
                LoxError::Syntax { line, .. }
                | LoxError::Parse { line, .. }
                | LoxError::Resolve { line, .. }
                | LoxError::Runtime { line, .. } => *line,
                _ => continue,
            };

            if let Some(origin) = origins.get(line) {
                error.relocate(origin);
            }
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = LoxError;
    type IntoIter = std::vec::IntoIter<LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
