// src/main.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use stone::ir::disassemble;
use stone::{Frame, Program, StoneError, Value};

#[derive(Parser, Debug)]
#[command(name = "stone")]
#[command(about = "Compile and run a Stone script")]
struct Args {
    /// Script to load (`.stone`)
    path: PathBuf,

    /// Function to execute after loading
    #[arg(long, default_value = "main")]
    entry: String,

    /// Print the token table
    #[arg(long)]
    dump_tokens: bool,

    /// Print the deduplicated user identifiers
    #[arg(long)]
    dump_identifiers: bool,

    /// Print every function with its disassembly, and the natives
    #[arg(long)]
    dump_functions: bool,

    /// Load (and dump) without executing
    #[arg(long)]
    no_run: bool,

    /// Arguments passed to the entry function
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn entry_arg(raw: &str) -> Value {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = raw.parse() {
            return Value::Int(i);
        }
    }
    Value::from(raw)
}

fn load(path: &Path) -> Result<Program, StoneError> {
    let source = fs::read_to_string(path).map_err(|source| StoneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    stone::load(&source)
}

fn dump_tokens(program: &Program) {
    println!(
        "{:<6}{:<6}{:<8}{:<20}{:<12}{}",
        "id", "row", "column", "text", "type", "subtype"
    );
    for token in program.tokens() {
        println!("{token}");
    }
}

fn dump_identifiers(program: &Program) {
    println!("{:<6}{:<6}{:<8}{}", "id", "row", "column", "name");
    for ident in program.identifiers() {
        println!(
            "{:<6}{:<6}{:<8}{}",
            ident.id, ident.row, ident.column, ident.text
        );
    }
}

fn dump_functions(program: &Program) {
    for (id, function) in program.functions().enumerate() {
        let params = function
            .params
            .iter()
            .map(|p| format!("{} {}", p.kind, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "fn#{id} {}({params})  locals: {}",
            function.name, function.locals
        );
        print!("{}", disassemble(&function.code));
    }
    for (id, native) in program.natives().iter().enumerate() {
        println!("native#{id} {}", native.name);
    }
    if !program.constants().is_empty() {
        println!("constants:");
        for (i, value) in program.constants().iter().enumerate() {
            println!("  [{i}] {} {value:?}", value.kind());
        }
    }
}

fn main() {
    init_logging();

    let args = Args::parse();

    if args.path.extension().and_then(|e| e.to_str()) != Some("stone") {
        eprintln!("Error: Stone scripts must have the .stone extension");
        process::exit(1);
    }

    let program = match load(&args.path) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    info!(path = %args.path.display(), "loaded script");

    if args.dump_tokens {
        dump_tokens(&program);
    }
    if args.dump_identifiers {
        dump_identifiers(&program);
    }
    if args.dump_functions {
        dump_functions(&program);
    }
    if args.no_run {
        return;
    }

    let mut frame = Frame::with_args(args.args.iter().map(|a| entry_arg(a)).collect());
    if let Err(e) = program.execute(&args.entry, &mut frame) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
