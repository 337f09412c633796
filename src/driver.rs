//! Build orchestration around the in-memory pipeline.
//!
//! Reads a source file, writes the generated listing next to the chosen output
//! stem and, when asked, hands it to `nasm` and `ld` to produce an executable.
//! Nothing is written unless the whole program compiled.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::error::{CompileResult, IoSnafu, ToolchainSnafu};

/// Output stem used when none is given: `out.asm`, `out.o`, `out`.
pub const DEFAULT_OUTPUT: &str = "out";

/// Everything the driver needs to know about one invocation.
#[derive(Debug, Clone)]
pub struct Options {
  pub input: PathBuf,
  pub output: PathBuf,
  pub build: bool,
}

impl Options {
  pub fn new(input: impl Into<PathBuf>) -> Self {
    Self {
      input: input.into(),
      output: PathBuf::from(DEFAULT_OUTPUT),
      build: false,
    }
  }

  pub fn asm_path(&self) -> PathBuf {
    self.with_suffix(".asm")
  }

  pub fn object_path(&self) -> PathBuf {
    self.with_suffix(".o")
  }

  pub fn executable_path(&self) -> PathBuf {
    self.with_suffix("")
  }

  /// `output` names a stem: a trailing `.asm` is dropped, any other dotted
  /// suffix is part of the name and extensions are appended after it.
  fn stem(&self) -> PathBuf {
    if self.output.extension() == Some(OsStr::new("asm")) {
      self.output.with_extension("")
    } else {
      self.output.clone()
    }
  }

  fn with_suffix(&self, suffix: &str) -> PathBuf {
    let mut path = self.stem().into_os_string();
    path.push(suffix);
    PathBuf::from(path)
  }
}

/// Files produced by [`compile_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
  pub asm: PathBuf,
  pub executable: Option<PathBuf>,
}

pub fn read_source(path: &Path) -> CompileResult<String> {
  fs::read_to_string(path).context(IoSnafu { path })
}

pub fn compile_file(options: &Options) -> CompileResult<Artifacts> {
  let source = read_source(&options.input)?;
  let asm = crate::generate_assembly(&source)?;

  let asm_path = options.asm_path();
  fs::write(&asm_path, asm).context(IoSnafu { path: &asm_path })?;
  info!(path = %asm_path.display(), "wrote assembly");

  let executable = if options.build {
    Some(assemble_and_link(&asm_path, options)?)
  } else {
    None
  };

  Ok(Artifacts {
    asm: asm_path,
    executable,
  })
}

fn assemble_and_link(asm_path: &Path, options: &Options) -> CompileResult<PathBuf> {
  let object = options.object_path();
  let executable = options.executable_path();

  run_tool(
    "nasm",
    &[
      OsStr::new("-felf64"),
      asm_path.as_os_str(),
      OsStr::new("-o"),
      object.as_os_str(),
    ],
  )?;
  run_tool(
    "ld",
    &[
      object.as_os_str(),
      OsStr::new("-o"),
      executable.as_os_str(),
    ],
  )?;

  info!(path = %executable.display(), "linked executable");
  Ok(executable)
}

fn run_tool(program: &str, args: &[&OsStr]) -> CompileResult<()> {
  let path = which::which(program).map_err(|err| {
    ToolchainSnafu {
      program,
      message: format!("not found on PATH ({err})"),
    }
    .build()
  })?;
  debug!(tool = %path.display(), ?args, "running");

  let status = Command::new(&path).args(args).status().map_err(|err| {
    ToolchainSnafu {
      program,
      message: format!("failed to start: {err}"),
    }
    .build()
  })?;
  ensure!(
    status.success(),
    ToolchainSnafu {
      program,
      message: format!("exited with {status}"),
    }
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn output_paths_share_one_stem() {
    let mut options = Options::new("prog.hy");
    options.output = PathBuf::from("build/prog.asm");
    assert_eq!(options.asm_path(), PathBuf::from("build/prog.asm"));
    assert_eq!(options.object_path(), PathBuf::from("build/prog.o"));
    assert_eq!(options.executable_path(), PathBuf::from("build/prog"));
  }

  #[test]
  fn dotted_stem_is_not_truncated() {
    let mut options = Options::new("prog.hy");
    options.output = PathBuf::from("my.prog");
    assert_eq!(options.asm_path(), PathBuf::from("my.prog.asm"));
    assert_eq!(options.object_path(), PathBuf::from("my.prog.o"));
    assert_eq!(options.executable_path(), PathBuf::from("my.prog"));
  }

  #[test]
  fn default_stem_matches_legacy_names() {
    let options = Options::new("prog.hy");
    assert_eq!(options.asm_path(), PathBuf::from("out.asm"));
    assert_eq!(options.executable_path(), PathBuf::from("out"));
  }

  #[test]
  fn missing_tool_is_a_toolchain_error() {
    let err = run_tool("hydroc-no-such-tool", &[]).expect_err("tool should be missing");
    assert!(err.to_string().starts_with("hydroc-no-such-tool: not found on PATH"));
  }
}
