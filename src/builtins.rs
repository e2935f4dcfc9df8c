// src/builtins.rs
//! Host natives available to every script loaded with the standard table.

use std::io::{self, BufRead, Read, Write};

use tracing::warn;

use crate::value::{Value, ValueKind};

/// Renders arguments separated by single spaces.
pub fn render(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_to<W: Write>(out: &mut W, args: &[Value]) -> io::Result<()> {
    writeln!(out, "{}", render(args))?;
    out.flush()
}

/// `print(...)`: writes every argument to stdout followed by a newline.
pub fn print(args: &mut [Value]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = print_to(&mut out, args) {
        warn!(error = %e, "print failed");
    }
}

// Reads one whitespace-separated word, `None` at end of input.
fn read_word<R: BufRead>(input: &mut R) -> Option<String> {
    let mut word = Vec::new();
    for byte in input.by_ref().bytes() {
        let Ok(b) = byte else { break };
        if b.is_ascii_whitespace() {
            if word.is_empty() {
                continue;
            }
            break;
        }
        word.push(b);
    }
    if word.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&word).into_owned())
    }
}

/// Fills each argument from `input` according to its current kind. Words
/// that do not parse as the argument's kind leave it unchanged.
pub fn scan_from<R: BufRead>(input: &mut R, args: &mut [Value]) {
    for arg in args.iter_mut() {
        if arg.kind() == ValueKind::None {
            continue;
        }
        let Some(word) = read_word(input) else {
            warn!("scan reached end of input");
            return;
        };
        match arg.kind() {
            ValueKind::Str => arg.set_str(word),
            ValueKind::Int => match word.parse::<i64>() {
                Ok(i) => arg.set_int(i),
                Err(_) => warn!(input = %word, "scan expected an integer"),
            },
            ValueKind::Bool => match word.as_str() {
                "1" | "true" => arg.set_bool(true),
                "0" | "false" => arg.set_bool(false),
                _ => warn!(input = %word, "scan expected a boolean"),
            },
            ValueKind::None => {}
        }
    }
}

/// `scan(...)`: reads one value per argument from stdin.
pub fn scan(args: &mut [Value]) {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    scan_from(&mut input, args);
}
