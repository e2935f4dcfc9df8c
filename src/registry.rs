// src/registry.rs
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Result, StoneError};
use crate::ir::Word;
use crate::lexer::{Identifier, Token};
use crate::value::{Value, ValueKind};
use crate::vm::{Frame, VM};

/// Host callback: receives the callee frame's argument list. Changes to the
/// arguments are copied back into the caller's variables.
pub type NativeFn = Box<dyn Fn(&mut [Value])>;

pub struct NativeFunction {
    pub name: String,
    callback: NativeFn,
}

impl NativeFunction {
    pub fn call(&self, args: &mut [Value]) {
        (self.callback)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Table of host functions visible to scripts. Ids follow registration
/// order.
#[derive(Debug, Default)]
pub struct Natives {
    table: IndexMap<String, NativeFunction>,
}

impl Natives {
    pub fn new() -> Self {
        Self::default()
    }

    /// `print` and `scan`.
    pub fn standard() -> Self {
        let mut natives = Self::new();
        natives.register("print", crate::builtins::print);
        natives.register("scan", crate::builtins::scan);
        natives
    }

    pub fn register(&mut self, name: &str, callback: impl Fn(&mut [Value]) + 'static) {
        self.table.insert(
            name.to_string(),
            NativeFunction {
                name: name.to_string(),
                callback: Box::new(callback),
            },
        );
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.table.get_index_of(name)
    }

    pub fn get(&self, id: usize) -> Option<&NativeFunction> {
        self.table.get_index(id).map(|(_, f)| f)
    }

    pub fn by_name(&self, name: &str) -> Option<&NativeFunction> {
        self.table.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeFunction> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ValueKind,
}

/// A compiled user function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    /// Number of local slots the body declares.
    pub locals: usize,
    pub code: Vec<Word>,
}

/// Everything produced by one load: compiled functions, host natives, the
/// literal pool, and the lexer tables kept for inspection. Immutable once
/// built; reloading builds a new one.
#[derive(Debug)]
pub struct Program {
    functions: IndexMap<String, Function>,
    natives: Natives,
    constants: Vec<Value>,
    tokens: Vec<Token>,
    identifiers: Vec<Identifier>,
}

impl Program {
    pub(crate) fn new(
        functions: IndexMap<String, Function>,
        natives: Natives,
        constants: Vec<Value>,
        tokens: Vec<Token>,
        identifiers: Vec<Identifier>,
    ) -> Self {
        Self {
            functions,
            natives,
            constants,
            tokens,
            identifiers,
        }
    }

    /// Runs `name` with `frame`: user functions first, then natives (which
    /// receive the frame's arguments).
    pub fn execute(&self, name: &str, frame: &mut Frame) -> Result<()> {
        if let Some((id, _, function)) = self.functions.get_full(name) {
            if frame.args().len() != function.params.len() {
                return Err(StoneError::ArgumentCount {
                    name: name.to_string(),
                    expected: function.params.len(),
                    found: frame.args().len(),
                });
            }
            VM::new(self).call(id, frame);
            return Ok(());
        }
        if let Some(native) = self.natives.by_name(name) {
            native.call(frame.args_mut());
            return Ok(());
        }
        Err(StoneError::UnknownEntry(name.to_string()))
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn function_by_id(&self, id: usize) -> &Function {
        match self.functions.get_index(id) {
            Some((_, f)) => f,
            None => panic!("function id {id} out of range"),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn natives(&self) -> &Natives {
        &self.natives
    }

    pub fn constant(&self, index: usize) -> &Value {
        &self.constants[index]
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }
}
