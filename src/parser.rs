//! Recursive-descent parser producing an arena-allocated program.
//!
//! Statements are recognised by fixed lookahead (`exit (` and `let ident =`),
//! while expressions use precedence climbing driven by
//! [`BinaryOp::precedence`]. Parsing is all-or-nothing: the first structural
//! problem aborts with a [`CompileError`] and no partial tree is returned.

use bumpalo::Bump;
use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::ast::{BinExpr, BinaryOp, Expr, Program, Stmt, Term};
use crate::error::{
  CompileError, CompileResult, ExpectedExpressionSnafu, ExpectedTokenSnafu,
  ExpressionTooDeepSnafu, InvalidStatementSnafu, MissingTokenTextSnafu,
};
use crate::tokenizer::{Token, TokenKind, describe_token};

/// Deepest allowed nesting of `parse_expr` calls. Parentheses and
/// right-hand operands each add a level; long left-associative chains do not.
pub const MAX_EXPR_DEPTH: usize = 256;

/// Parse a whole token vector into a program whose nodes live in `arena`.
pub fn parse<'a>(tokens: &[Token], arena: &'a Bump) -> CompileResult<Program<'a>> {
  let mut parser = Parser {
    stream: TokenStream::new(tokens),
    arena,
    depth: 0,
  };
  parser.parse_prog()
}

struct Parser<'t, 'a> {
  stream: TokenStream<'t>,
  arena: &'a Bump,
  depth: usize,
}

impl<'a> Parser<'_, 'a> {
  fn parse_prog(&mut self) -> CompileResult<Program<'a>> {
    let mut program = Program::default();
    while !self.stream.is_eof() {
      let stmt = self.parse_stmt()?;
      program.stmts.push(stmt);
    }
    debug!(statements = program.stmts.len(), "parsed program");
    Ok(program)
  }

  fn parse_stmt(&mut self) -> CompileResult<&'a Stmt<'a>> {
    if self.stream.peek_kind(0) == Some(TokenKind::KeywordExit)
      && self.stream.peek_kind(1) == Some(TokenKind::OpenParen)
    {
      self.stream.advance(2);
      let expr = self
        .parse_expr(0)?
        .context(ExpectedExpressionSnafu {
          context: "after \"exit(\"",
        })?;
      self.stream.skip(TokenKind::CloseParen)?;
      self.stream.skip(TokenKind::Semicolon)?;
      trace!("parsed exit statement");
      let stmt: &'a Stmt<'a> = self.arena.alloc(Stmt::Exit { expr });
      return Ok(stmt);
    }

    if self.stream.peek_kind(0) == Some(TokenKind::KeywordLet)
      && self.stream.peek_kind(1) == Some(TokenKind::Identifier)
      && self.stream.peek_kind(2) == Some(TokenKind::Equals)
    {
      self.stream.advance(1);
      let name = self.take_text()?;
      self.stream.advance(1);
      let expr = self
        .parse_expr(0)?
        .context(ExpectedExpressionSnafu {
          context: "after \"=\" in let statement",
        })?;
      self.stream.skip(TokenKind::Semicolon)?;
      trace!(name, "parsed let statement");
      let stmt: &'a Stmt<'a> = self.arena.alloc(Stmt::Let { name, expr });
      return Ok(stmt);
    }

    InvalidStatementSnafu {
      found: describe_token(self.stream.peek(0)),
    }
    .fail()
  }

  /// Precedence climbing: fold operators binding at least as tightly as
  /// `min_prec` into a left-leaning tree. `Ok(None)` means no term starts here.
  fn parse_expr(&mut self, min_prec: u8) -> CompileResult<Option<&'a Expr<'a>>> {
    ensure!(
      self.depth < MAX_EXPR_DEPTH,
      ExpressionTooDeepSnafu {
        limit: MAX_EXPR_DEPTH
      }
    );
    self.depth += 1;
    let expr = self.climb(min_prec);
    self.depth -= 1;
    expr
  }

  fn climb(&mut self, min_prec: u8) -> CompileResult<Option<&'a Expr<'a>>> {
    let Some(term) = self.parse_term()? else {
      return Ok(None);
    };
    let mut lhs: &'a Expr<'a> = self.arena.alloc(Expr::Term(term));

    loop {
      let Some(op) = self
        .stream
        .peek_kind(0)
        .and_then(BinaryOp::from_token)
      else {
        break;
      };
      if op.precedence() < min_prec {
        break;
      }
      self.stream.advance(1);

      let rhs = self
        .parse_expr(op.precedence() + 1)?
        .context(ExpectedExpressionSnafu {
          context: "after binary operator",
        })?;
      let bin: &'a BinExpr<'a> = self.arena.alloc(BinExpr { op, lhs, rhs });
      lhs = &*self.arena.alloc(Expr::Binary(bin));
    }

    Ok(Some(lhs))
  }

  fn parse_term(&mut self) -> CompileResult<Option<&'a Term<'a>>> {
    let term = match self.stream.peek_kind(0) {
      Some(TokenKind::IntLiteral) => Term::IntLit(self.take_text()?),
      Some(TokenKind::Identifier) => Term::Ident(self.take_text()?),
      Some(TokenKind::OpenParen) => {
        self.stream.advance(1);
        let inner = self
          .parse_expr(0)?
          .context(ExpectedExpressionSnafu {
            context: "after \"(\"",
          })?;
        self.stream.skip(TokenKind::CloseParen)?;
        Term::Paren(inner)
      }
      _ => return Ok(None),
    };
    let term: &'a Term<'a> = self.arena.alloc(term);
    Ok(Some(term))
  }

  /// Consume the current token, copying its literal text into the arena.
  fn take_text(&mut self) -> CompileResult<&'a str> {
    let text: &'a str = self.arena.alloc_str(self.stream.text()?);
    self.stream.advance(1);
    Ok(text)
  }
}

/// Cursor over the fully materialised token vector.
struct TokenStream<'t> {
  tokens: &'t [Token],
  pos: usize,
}

impl<'t> TokenStream<'t> {
  fn new(tokens: &'t [Token]) -> Self {
    Self { tokens, pos: 0 }
  }

  fn peek(&self, offset: usize) -> Option<&'t Token> {
    self.tokens.get(self.pos + offset)
  }

  fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
    self.peek(offset).map(|token| token.kind)
  }

  fn advance(&mut self, count: usize) {
    self.pos = (self.pos + count).min(self.tokens.len());
  }

  /// Literal text of the current token.
  fn text(&self) -> CompileResult<&'t str> {
    let Some(token) = self.peek(0) else {
      return ExpectedExpressionSnafu {
        context: "before end of input",
      }
      .fail();
    };
    token
      .text
      .as_deref()
      .context(MissingTokenTextSnafu { kind: token.kind })
  }

  /// Consume a token of the given kind or fail naming what was found instead.
  fn skip(&mut self, kind: TokenKind) -> CompileResult<()> {
    if self.peek_kind(0) == Some(kind) {
      self.pos += 1;
      return Ok(());
    }
    Err(self.unexpected(kind))
  }

  fn unexpected(&self, kind: TokenKind) -> CompileError {
    ExpectedTokenSnafu {
      expected: kind.spelling().unwrap_or("token"),
      found: describe_token(self.peek(0)),
    }
    .build()
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.tokens.len()
  }
}
