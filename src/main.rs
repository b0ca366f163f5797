use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use cinder::bytecode::disasm::print_chunk;
use cinder::frontend::{scanner::Scanner, token_dumper::TokenDumper};
use cinder::{Chunk, InterpretError, InterpretResult, Vm, VmConfig, compile};

// sysexits(3) codes
const EXIT_DATA_ERROR: i32 = 65;
const EXIT_SOFTWARE_ERROR: i32 = 70;
const EXIT_IO_ERROR: i32 = 74;

#[derive(Parser, Debug)]
#[command(name = "cinder")]
#[command(about = "Single-pass expression compiler and bytecode VM")]
struct Cli {
    /// Source file to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Show tokens only
    #[arg(long)]
    tokens: bool,

    /// Disable ANSI colors in token output
    #[arg(long)]
    no_color: bool,

    /// Print bare lexemes instead of debug-quoted ones in token output
    #[arg(long, requires = "tokens")]
    pretty: bool,

    /// Print the disassembled bytecode before running
    #[arg(long = "bc")]
    bytecode: bool,

    /// Trace every executed instruction
    #[arg(long)]
    trace: bool,

    /// Compile FILE and write its bytecode image here instead of running it
    #[arg(long, value_name = "OUT")]
    emit: Option<PathBuf>,

    /// Treat FILE as a bytecode image written by --emit
    #[arg(long, conflicts_with_all = ["tokens", "emit"])]
    image: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.trace);

    let config = VmConfig {
        trace_execution: cli.trace,
        print_code: cli.trace,
    };

    match &cli.file {
        None => repl(config, cli.bytecode),
        Some(path) => {
            if let Err(code) = run_file(path, &cli, config) {
                process::exit(code);
            }
        }
    }
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn repl(config: VmConfig, bytecode: bool) {
    let mut vm = Vm::with_config(config);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("failed to read input: {}", e);
                process::exit(EXIT_IO_ERROR);
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        // a failed line only aborts that line
        let _ = report(execute(&mut vm, &line, bytecode));
    }
}

fn run_file(path: &Path, cli: &Cli, config: VmConfig) -> Result<(), i32> {
    let mut vm = Vm::with_config(config);

    if cli.image {
        let bytes = fs::read(path).map_err(|e| io_failure(path, e))?;
        let chunk = Chunk::from_bytes(&bytes).map_err(|e| {
            eprintln!("Invalid bytecode image '{}': {}", path.display(), e);
            EXIT_DATA_ERROR
        })?;

        if cli.bytecode {
            print_chunk(&chunk, &path.display().to_string());
        }
        return report(vm.run_chunk(chunk).map_err(InterpretError::from));
    }

    let source = fs::read_to_string(path).map_err(|e| io_failure(path, e))?;

    if cli.tokens {
        token_dumper(cli.no_color, cli.pretty).dump(Scanner::new(&source));
        return Ok(());
    }

    if let Some(out) = &cli.emit {
        return emit_image(&source, out);
    }

    report(execute(&mut vm, &source, cli.bytecode))
}

fn execute(vm: &mut Vm, source: &str, bytecode: bool) -> InterpretResult {
    if !bytecode {
        return vm.interpret(source);
    }

    let mut chunk = Chunk::new();
    compile(source, &mut chunk)?;
    print_chunk(&chunk, "code");
    Ok(vm.run_chunk(chunk)?)
}

/// Print the outcome and map failures to an exit code.
fn report(result: InterpretResult) -> Result<(), i32> {
    match result {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(InterpretError::Compile(errors)) => {
            if let Some(first) = errors.first() {
                debug!(line = first.line, "compile failed");
            }
            eprintln!("{}", errors);
            Err(EXIT_DATA_ERROR)
        }
        Err(InterpretError::Runtime(e)) => {
            debug!(line = ?e.line(), offset = e.offset(), "runtime error");
            eprintln!("Runtime error: {}", e);
            Err(EXIT_SOFTWARE_ERROR)
        }
    }
}

fn token_dumper(no_color: bool, pretty: bool) -> TokenDumper {
    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }
    dumper
}

fn emit_image(source: &str, out: &Path) -> Result<(), i32> {
    let mut chunk = Chunk::new();
    if let Err(errors) = compile(source, &mut chunk) {
        eprintln!("{}", errors);
        return Err(EXIT_DATA_ERROR);
    }

    let bytes = chunk.to_bytes().map_err(|e| {
        eprintln!("Failed to encode bytecode image: {}", e);
        EXIT_SOFTWARE_ERROR
    })?;
    fs::write(out, &bytes).map_err(|e| io_failure(out, e))?;

    debug!(path = %out.display(), bytes = bytes.len(), "bytecode image written");
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

fn io_failure(path: &Path, e: io::Error) -> i32 {
    eprintln!("Failed to access '{}': {}", path.display(), e);
    EXIT_IO_ERROR
}
