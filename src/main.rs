use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use mos6502_asm::asm::encoding::{strip_leading_zeros, BinaryFormat, HexFormat, ImageFormat};
use mos6502_asm::asm::{assemble, AsmErr};
use mos6502_asm::err::Error as _;
use mos6502_asm::parse::lex::tokenize_lines;
use mos6502_asm::prep::{Preprocessor, DEFAULT_MAX_DEPTH};
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Assembly source file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "out.bin")]
    output: PathBuf,

    /// Also print the output as hex
    #[arg(short, long)]
    print: bool,

    /// Cut leading null bytes from the output
    #[arg(short = 'n', long)]
    cut_null: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,

    /// How deeply `.INCLUDE`s can be nested
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_include_depth: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = main_real(args) {
        tracing::error!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Renders an assembly error with the preprocessed line it points to.
fn report(err: &AsmErr, lines: &[String]) -> String {
    let mut msg = err.report();
    let line = err.span()
        .and_then(|span| lines.get(span.line().checked_sub(1)?));
    if let Some(line) = line {
        msg.push_str(&format!("\n  | {}", line.trim_end()));
    }
    msg
}

fn main_real(args: Args) -> Result<(), Box<dyn Error>> {
    info!("assembling {} into {}", args.input.display(), args.output.display());
    let start = Instant::now();

    let task = Instant::now();
    let lines = Preprocessor::new()
        .with_max_depth(args.max_include_depth)
        .preprocess_file(&args.input)
        .map_err(|e| e.report())?;
    info!("stage 1 - preprocessing done in {:?}", task.elapsed());

    let task = Instant::now();
    let tokens = tokenize_lines(&lines)
        .map_err(|e| report(&AsmErr::Lex(e), &lines))?;
    info!("stage 2 - lexical analysis done in {:?}", task.elapsed());

    let task = Instant::now();
    let obj = assemble(&tokens)
        .map_err(|e| report(&AsmErr::Parse(e), &lines))?;
    for (label, addr) in obj.label_iter() {
        debug!("${addr:04X} {label}");
    }

    let image = match args.cut_null {
        true  => strip_leading_zeros(obj.as_bytes()),
        false => obj.as_bytes(),
    };
    std::fs::write(&args.output, BinaryFormat::serialize(image))
        .map_err(|e| format!("cannot write {}: {e}", args.output.display()))?;
    info!("stage 3 - parsing and assembling done in {:?} ({} bytes)", task.elapsed(), image.len());

    if args.print {
        println!("Assembler output: {}", HexFormat::serialize(image));
    }

    info!("task done in {:?}", start.elapsed());
    Ok(())
}
