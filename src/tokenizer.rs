//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about grammar. Words made of ASCII letters are
//! either one of the two keywords or an identifier, digit runs are integer
//! literals, and the remaining punctuators are all single characters.

use std::fmt;

use tracing::trace;

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  IntLiteral,
  Identifier,
  Semicolon,
  OpenParen,
  CloseParen,
  KeywordExit,
  KeywordLet,
  Equals,
  Plus,
  Star,
  Minus,
  Slash,
}

impl TokenKind {
  /// Source spelling for fixed tokens; `None` for literal-carrying kinds.
  pub fn spelling(self) -> Option<&'static str> {
    match self {
      TokenKind::IntLiteral | TokenKind::Identifier => None,
      TokenKind::Semicolon => Some(";"),
      TokenKind::OpenParen => Some("("),
      TokenKind::CloseParen => Some(")"),
      TokenKind::KeywordExit => Some("exit"),
      TokenKind::KeywordLet => Some("let"),
      TokenKind::Equals => Some("="),
      TokenKind::Plus => Some("+"),
      TokenKind::Star => Some("*"),
      TokenKind::Minus => Some("-"),
      TokenKind::Slash => Some("/"),
    }
  }
}

/// A single lexeme. `text` is only populated for literals and identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: Option<String>,
  pub loc: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize) -> Self {
    Self {
      kind,
      text: None,
      loc,
    }
  }

  pub fn with_text(kind: TokenKind, loc: usize, text: impl Into<String>) -> Self {
    Self {
      kind,
      text: Some(text.into()),
      loc,
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.text, self.kind.spelling()) {
      (Some(text), _) => f.write_str(text),
      (None, Some(spelling)) => f.write_str(spelling),
      (None, None) => write!(f, "{:?}", self.kind),
    }
  }
}

/// Lex the input into a flat vector of tokens. The end of the vector is the
/// end of input; no sentinel token is appended.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
      }
      let token = match &input[start..i] {
        "exit" => Token::new(TokenKind::KeywordExit, start),
        "let" => Token::new(TokenKind::KeywordLet, start),
        word => Token::with_text(TokenKind::Identifier, start, word),
      };
      tokens.push(token);
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      tokens.push(Token::with_text(
        TokenKind::IntLiteral,
        start,
        &input[start..i],
      ));
      continue;
    }

    let kind = match c {
      b'(' => Some(TokenKind::OpenParen),
      b')' => Some(TokenKind::CloseParen),
      b';' => Some(TokenKind::Semicolon),
      b'=' => Some(TokenKind::Equals),
      b'+' => Some(TokenKind::Plus),
      b'*' => Some(TokenKind::Star),
      b'-' => Some(TokenKind::Minus),
      b'/' => Some(TokenKind::Slash),
      _ => None,
    };
    if let Some(kind) = kind {
      tokens.push(Token::new(kind, i));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  trace!(count = tokens.len(), "tokenized input");
  Ok(tokens)
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => t.to_string(),
    None => "end of input".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
      .expect("source should tokenize")
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn keywords_and_identifiers() {
    let tokens = tokenize("let exit letx = 1;").expect("tokenize");
    assert_eq!(tokens[0].kind, TokenKind::KeywordLet);
    assert_eq!(tokens[1].kind, TokenKind::KeywordExit);
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens[2].text.as_deref(), Some("letx"));
    assert_eq!(tokens[3].kind, TokenKind::Equals);
    assert_eq!(tokens[4].text.as_deref(), Some("1"));
    assert_eq!(tokens[5].kind, TokenKind::Semicolon);
  }

  #[test]
  fn punctuators_are_single_characters() {
    assert_eq!(
      kinds("exit((1+2)*3-4/5);"),
      vec![
        TokenKind::KeywordExit,
        TokenKind::OpenParen,
        TokenKind::OpenParen,
        TokenKind::IntLiteral,
        TokenKind::Plus,
        TokenKind::IntLiteral,
        TokenKind::CloseParen,
        TokenKind::Star,
        TokenKind::IntLiteral,
        TokenKind::Minus,
        TokenKind::IntLiteral,
        TokenKind::Slash,
        TokenKind::IntLiteral,
        TokenKind::CloseParen,
        TokenKind::Semicolon,
      ]
    );
  }

  #[test]
  fn digits_end_a_word() {
    let tokens = tokenize("ab12").expect("tokenize");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].text.as_deref(), Some("ab"));
    assert_eq!(tokens[1].kind, TokenKind::IntLiteral);
    assert_eq!(tokens[1].loc, 2);
  }

  #[test]
  fn empty_input_has_no_tokens() {
    assert!(tokenize("  \n\t ").expect("tokenize").is_empty());
  }

  #[test]
  fn rejects_unknown_characters() {
    let err = tokenize("exit(1 % 2);").unwrap_err();
    assert!(err.to_string().contains("invalid token: '%'"));
  }
}
