//! Code generation: lower the parsed program into x86-64 NASM assembly.
//!
//! The emitter is a pure stack machine. Every expression leaves exactly one
//! 8-byte value on the runtime stack; `let` bindings simply leave theirs in
//! place, so a variable is addressed relative to `rsp` by counting how many
//! values have been pushed since it was declared.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{BinExpr, BinaryOp, Expr, Program, Stmt, Term};
use crate::error::{CompileResult, DuplicateIdentifierSnafu, UndeclaredIdentifierSnafu};

/// Width of one stack slot in bytes.
const SLOT_SIZE: usize = 8;

/// Linux `exit` syscall number.
const SYS_EXIT: u32 = 60;

/// Emit assembly for a whole program.
pub fn generate(program: &Program<'_>) -> CompileResult<String> {
  let mut generator = Generator::default();
  generator.gen_prog(program)?;
  debug!(
    bytes = generator.asm.len(),
    live_slots = generator.stack_size,
    "generated assembly"
  );
  Ok(generator.asm)
}

/// A declared variable: the stack slot its value was pushed into.
#[derive(Debug, Clone, Copy)]
struct Var {
  stack_slot: usize,
}

/// Mutable state for one compilation unit.
#[derive(Debug, Default)]
struct Generator {
  asm: String,
  /// Number of values currently on the runtime stack.
  stack_size: usize,
  vars: HashMap<String, Var>,
}

impl Generator {
  fn gen_prog(&mut self, program: &Program<'_>) -> CompileResult<()> {
    self.asm.push_str("global _start\n");
    self.asm.push_str("_start:\n");

    for stmt in program.iter() {
      self.gen_stmt(stmt)?;
    }

    // Falling off the end exits with status 0.
    self.asm.push_str(&format!("    mov rax, {SYS_EXIT}\n"));
    self.asm.push_str("    mov rdi, 0\n");
    self.asm.push_str("    syscall\n");
    Ok(())
  }

  fn gen_stmt(&mut self, stmt: &Stmt<'_>) -> CompileResult<()> {
    match stmt {
      Stmt::Exit { expr } => {
        self.gen_expr(expr)?;
        self.asm.push_str(&format!("    mov rax, {SYS_EXIT}\n"));
        self.pop("rdi");
        self.asm.push_str("    syscall\n");
      }
      Stmt::Let { name, expr } => {
        if self.vars.contains_key(*name) {
          return DuplicateIdentifierSnafu { name: *name }.fail();
        }
        // The slot is fixed before the initialiser runs: its result is the
        // next value left behind once all temporaries are popped again. The
        // name only becomes visible afterwards, so `let a = a;` is rejected.
        let var = Var {
          stack_slot: self.stack_size,
        };
        self.gen_expr(expr)?;
        trace!(name, slot = var.stack_slot, "declared variable");
        self.vars.insert((*name).to_string(), var);
      }
    }
    Ok(())
  }

  fn gen_expr(&mut self, expr: &Expr<'_>) -> CompileResult<()> {
    match expr {
      Expr::Term(term) => self.gen_term(term),
      Expr::Binary(bin) => self.gen_bin_expr(bin),
    }
  }

  fn gen_term(&mut self, term: &Term<'_>) -> CompileResult<()> {
    match term {
      Term::IntLit(value) => {
        self.asm.push_str(&format!("    mov rax, {value}\n"));
        self.push("rax");
      }
      Term::Ident(name) => {
        let Some(var) = self.vars.get(*name).copied() else {
          return UndeclaredIdentifierSnafu { name: *name }.fail();
        };
        let offset = SLOT_SIZE * (self.stack_size - var.stack_slot - 1);
        self.push(&format!("QWORD [rsp + {offset}]"));
      }
      Term::Paren(inner) => self.gen_expr(inner)?,
    }
    Ok(())
  }

  /// Evaluate lhs then rhs, so rhs ends on top and is popped first.
  ///
  /// Left-associative chains grow down the lhs side, so that spine is walked
  /// with a loop; only right operands and parentheses recurse, and the parser
  /// bounds their depth.
  fn gen_bin_expr(&mut self, bin: &BinExpr<'_>) -> CompileResult<()> {
    let mut spine = vec![bin];
    let mut leftmost = bin.lhs;
    while let Expr::Binary(inner) = *leftmost {
      spine.push(inner);
      leftmost = inner.lhs;
    }

    self.gen_expr(leftmost)?;
    for bin in spine.into_iter().rev() {
      self.gen_expr(bin.rhs)?;
      self.apply(bin.op);
    }
    Ok(())
  }

  /// Combine the two values on top of the stack.
  fn apply(&mut self, op: BinaryOp) {
    self.pop("rbx");
    self.pop("rax");
    match op {
      BinaryOp::Add => self.asm.push_str("    add rax, rbx\n"),
      BinaryOp::Sub => self.asm.push_str("    sub rax, rbx\n"),
      BinaryOp::Mul => self.asm.push_str("    mul rbx\n"),
      BinaryOp::Div => {
        self.asm.push_str("    xor rdx, rdx\n");
        self.asm.push_str("    div rbx\n");
      }
    }
    self.push("rax");
  }

  fn push(&mut self, operand: &str) {
    self.asm.push_str(&format!("    push {operand}\n"));
    self.stack_size += 1;
  }

  fn pop(&mut self, reg: &str) {
    debug_assert!(self.stack_size > 0, "pop from an empty stack");
    self.asm.push_str(&format!("    pop {reg}\n"));
    self.stack_size -= 1;
  }
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;

  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn compile(source: &str) -> CompileResult<String> {
    let arena = Bump::new();
    let program = parse(&tokenize(source)?, &arena)?;
    generate(&program)
  }

  fn body(asm: &str) -> Vec<&str> {
    asm.lines().skip(2).map(str::trim).collect()
  }

  #[test]
  fn empty_program_only_exits_with_zero() {
    let asm = compile("").expect("compile");
    assert_eq!(
      asm,
      "global _start\n_start:\n    mov rax, 60\n    mov rdi, 0\n    syscall\n"
    );
  }

  #[test]
  fn exit_pops_status_into_rdi() {
    let asm = compile("exit(7);").expect("compile");
    assert_eq!(
      body(&asm),
      [
        "mov rax, 7",
        "push rax",
        "mov rax, 60",
        "pop rdi",
        "syscall",
        "mov rax, 60",
        "mov rdi, 0",
        "syscall",
      ]
    );
  }

  #[test]
  fn variable_offsets_count_from_the_top_of_stack() {
    let asm = compile("let a = 1; let b = 2; exit(a + b);").expect("compile");
    assert_eq!(
      body(&asm)[..8],
      [
        "mov rax, 1",
        "push rax",
        "mov rax, 2",
        "push rax",
        // a sits two slots below the top, b one below.
        "push QWORD [rsp + 8]",
        "push QWORD [rsp + 8]",
        "pop rbx",
        "pop rax",
      ]
    );
  }

  #[test]
  fn let_reserves_slot_below_temporaries() {
    let asm = compile("let a = 2 * 3; let b = a; exit(b);").expect("compile");
    let lines = body(&asm);
    // `b` is declared with one live slot (a), so it reads a at offset 0.
    assert!(lines.contains(&"push QWORD [rsp + 0]"));
    assert_eq!(lines.iter().filter(|l| l.starts_with("push")).count(), 5);
  }

  #[test]
  fn chain_lowers_in_source_order() {
    let asm = compile("exit(9 - 4 - 2);").expect("compile");
    assert_eq!(
      body(&asm)[..12],
      [
        "mov rax, 9",
        "push rax",
        "mov rax, 4",
        "push rax",
        "pop rbx",
        "pop rax",
        "sub rax, rbx",
        "push rax",
        "mov rax, 2",
        "push rax",
        "pop rbx",
        "pop rax",
      ]
    );
  }

  #[test]
  fn very_long_chain_compiles() {
    let source = format!("let a = 1; exit(a{});", " + a".repeat(100_000));
    let asm = compile(&source).expect("compile");
    assert_eq!(asm.matches("add rax, rbx").count(), 100_000);
    // Later reads of `a` skip over the running sum above it.
    assert!(asm.contains("push QWORD [rsp + 8]"));
  }

  #[test]
  fn division_clears_rdx_first() {
    let asm = compile("exit(8 / 2);").expect("compile");
    let lines = body(&asm);
    let div = lines.iter().position(|l| *l == "div rbx").expect("div emitted");
    assert_eq!(lines[div - 1], "xor rdx, rdx");
  }

  #[test]
  fn rejects_undeclared_identifier() {
    let err = compile("exit(y);").expect_err("should fail");
    assert_eq!(err.to_string(), "identifier \"y\" does not exist");
  }

  #[test]
  fn rejects_redeclaration() {
    let err = compile("let x = 1; let x = 2; exit(x);").expect_err("should fail");
    assert_eq!(err.to_string(), "identifier \"x\" already exists");
  }

  #[test]
  fn initialiser_cannot_see_its_own_binding() {
    let err = compile("let a = a;").expect_err("should fail");
    assert_eq!(err.to_string(), "identifier \"a\" does not exist");
  }

  #[test]
  fn redeclaration_is_reported_before_the_initialiser() {
    let err = compile("let x = 1; let x = y;").expect_err("should fail");
    assert_eq!(err.to_string(), "identifier \"x\" already exists");
  }
}
