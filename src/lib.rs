//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` builds an arena-allocated AST (`ast`) by precedence climbing.
//! - `codegen` lowers the program into x86-64 NASM assembly.
//! - `driver` handles files and the external assembler/linker.
//! - `error` holds the single error type shared by every stage.

pub mod ast;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod parser;
pub mod tokenizer;

use bumpalo::Bump;

pub use error::{CompileError, CompileResult};

/// Compile a source string into NASM assembly.
///
/// The AST arena lives for exactly this call.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  let arena = Bump::new();
  let program = parser::parse(&tokens, &arena)?;
  codegen::generate(&program)
}
