use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hydroc::driver::{self, DEFAULT_OUTPUT, Options};

#[derive(Parser, Debug)]
#[command(name = "hydroc")]
#[command(about = "Compile a let/exit program to x86-64 NASM assembly")]
struct Args {
  /// Source file to compile
  input: PathBuf,

  /// Output stem (a trailing .asm is dropped); produces <stem>.asm, and <stem>.o
  /// plus <stem> with --build
  #[arg(short, long, default_value = DEFAULT_OUTPUT)]
  output: PathBuf,

  /// Assemble with nasm and link with ld after writing the listing
  #[arg(long, conflicts_with = "stdout")]
  build: bool,

  /// Print the listing to stdout instead of writing any file
  #[arg(long)]
  stdout: bool,
}

fn init_logging() {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,hydroc=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  init_logging();

  let args = Args::parse();

  if args.stdout {
    let result =
      driver::read_source(&args.input).and_then(|source| hydroc::generate_assembly(&source));
    match result {
      Ok(asm) => print!("{asm}"),
      Err(err) => fail(&err),
    }
    return;
  }

  let options = Options {
    input: args.input,
    output: args.output,
    build: args.build,
  };
  match driver::compile_file(&options) {
    Ok(artifacts) => debug!(?artifacts, "compilation finished"),
    Err(err) => fail(&err),
  }
}

fn fail(err: &hydroc::CompileError) -> ! {
  eprintln!("{err}");
  process::exit(1);
}
