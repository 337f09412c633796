//! Shared error type used across the compilation pipeline.
//!
//! Every failure is fatal: stages return the first error they hit and the
//! binary reports it on stderr before exiting. All messages are one line;
//! lexical errors carry the 1-based line and column of the offending byte.

use std::path::PathBuf;

use snafu::Snafu;

use crate::tokenizer::TokenKind;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{message} at line {line}, column {column}"))]
  WithLocation {
    line: usize,
    column: usize,
    message: String,
  },

  #[snafu(display("expression nests deeper than {limit} levels"))]
  ExpressionTooDeep { limit: usize },

  #[snafu(display("expected expression {context}"))]
  ExpectedExpression { context: &'static str },

  #[snafu(display("expected \"{expected}\", but got \"{found}\""))]
  ExpectedToken {
    expected: &'static str,
    found: String,
  },

  #[snafu(display("internal error: {kind:?} token carries no text"))]
  MissingTokenText { kind: TokenKind },

  #[snafu(display("invalid statement starting at \"{found}\""))]
  InvalidStatement { found: String },

  #[snafu(display("identifier \"{name}\" does not exist"))]
  UndeclaredIdentifier { name: String },

  #[snafu(display("identifier \"{name}\" already exists"))]
  DuplicateIdentifier { name: String },

  #[snafu(display("could not access {}: {source}", path.display()))]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("{program}: {message}"))]
  Toolchain { program: String, message: String },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let before = &source[..safe_loc];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Self::WithLocation {
      line: before.matches('\n').count() + 1,
      column: before[line_start..].chars().count() + 1,
      message: message.into(),
    }
  }
}
