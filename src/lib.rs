// src/lib.rs
//! Stone: a small C-like scripting language compiled to a flat bytecode and
//! run on an accumulator machine.
//!
//! ```no_run
//! let program = stone::load("void main() { print(\"hello\"); }")?;
//! program.execute("main", &mut stone::Frame::new())?;
//! # Ok::<(), stone::StoneError>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod value;
pub mod vm;

use tracing::debug;

pub use error::{Result, StoneError};
pub use registry::{Function, NativeFunction, Natives, Program};
pub use value::{Value, ValueKind};
pub use vm::Frame;

/// Loads `source` with the standard natives (`print`, `scan`).
pub fn load(source: &str) -> Result<Program> {
    load_with(source, Natives::standard())
}

/// Loads `source` against a caller-supplied native table.
pub fn load_with(source: &str, natives: Natives) -> Result<Program> {
    let lexed = lexer::Lexer::new(source).lex()?;
    let program = codegen::compile(lexed, natives)?;
    debug!(functions = program.functions().count(), "program loaded");
    Ok(program)
}
