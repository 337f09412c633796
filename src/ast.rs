//! Syntax tree produced by the parser.
//!
//! Nodes are allocated in a `bumpalo::Bump` owned by the caller and refer to
//! each other through plain shared references, so the whole tree lives exactly
//! as long as one compilation unit and is dropped in bulk with the arena.

use crate::tokenizer::TokenKind;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  pub fn from_token(kind: TokenKind) -> Option<Self> {
    match kind {
      TokenKind::Plus => Some(BinaryOp::Add),
      TokenKind::Minus => Some(BinaryOp::Sub),
      TokenKind::Star => Some(BinaryOp::Mul),
      TokenKind::Slash => Some(BinaryOp::Div),
      _ => None,
    }
  }

  /// Binding strength, higher binds tighter.
  ///
  /// Every operator has its own level (`+` < `-` < `*` < `/`), which is the
  /// language's rule rather than the textbook one: `2 * 7 / 2` parses as
  /// `2 * (7 / 2)`.
  pub fn precedence(self) -> u8 {
    match self {
      BinaryOp::Add => 0,
      BinaryOp::Sub => 1,
      BinaryOp::Mul => 2,
      BinaryOp::Div => 3,
    }
  }
}

/// Leaf-ish operands of an expression.
#[derive(Debug, PartialEq, Eq)]
pub enum Term<'a> {
  IntLit(&'a str),
  Ident(&'a str),
  Paren(&'a Expr<'a>),
}

#[derive(Debug, PartialEq, Eq)]
pub struct BinExpr<'a> {
  pub op: BinaryOp,
  pub lhs: &'a Expr<'a>,
  pub rhs: &'a Expr<'a>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Expr<'a> {
  Term(&'a Term<'a>),
  Binary(&'a BinExpr<'a>),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Stmt<'a> {
  Exit { expr: &'a Expr<'a> },
  Let { name: &'a str, expr: &'a Expr<'a> },
}

/// Statements in source order, which is also execution order.
#[derive(Debug, Default)]
pub struct Program<'a> {
  pub stmts: Vec<&'a Stmt<'a>>,
}

impl<'a> Program<'a> {
  pub fn is_empty(&self) -> bool {
    self.stmts.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &'a Stmt<'a>> + '_ {
    self.stmts.iter().copied()
  }
}
