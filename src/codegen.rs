// src/codegen.rs
//! Lowers recognized statements to the flat instruction encoding in
//! [`crate::ir`]. Forward jumps are emitted against labels and patched once
//! the function body is complete.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{
    ArithOp, Arithmetic, Assign, Call, CompareOp, FunctionDecl, If, Span, Stmt, TokenIdx, VarDecl,
    While,
};
use crate::error::{Result, StoneError};
use crate::ir::{Opcode, Operand, Word};
use crate::lexer::{Lexed, SubType, Token, TokenType};
use crate::parser::{error_at, recognize_comparison, recognize_statement, Cursor, Parser};
use crate::registry::{Function, Natives, Param, Program};
use crate::value::Value;

fn arith_opcode(op: ArithOp) -> Opcode {
    match op {
        ArithOp::Add => Opcode::Add,
        ArithOp::Subtract => Opcode::Subtract,
        ArithOp::Multiply => Opcode::Multiply,
        ArithOp::Divide => Opcode::Divide,
    }
}

fn compare_opcode(op: CompareOp) -> Opcode {
    match op {
        CompareOp::Equal => Opcode::Equal,
        CompareOp::NotEqual => Opcode::NotEqual,
        CompareOp::More => Opcode::More,
        CompareOp::MoreOrEqual => Opcode::MoreOrEqual,
        CompareOp::Less => Opcode::Less,
        CompareOp::LessOrEqual => Opcode::LessOrEqual,
    }
}

/// Compiles every function in `lexed` into a [`Program`] that calls into
/// `natives`.
pub fn compile(lexed: Lexed, natives: Natives) -> Result<Program> {
    let mut constants = Vec::new();
    let functions = {
        let tokens = &lexed.tokens;
        let decls = Parser::new(tokens).parse()?;
        debug!(count = decls.len(), "recognized functions");

        // Signatures first so calls may refer to functions declared later.
        let mut signatures: IndexMap<String, Vec<Param>> = IndexMap::new();
        for decl in &decls {
            let name = &tokens[decl.name].text;
            if signatures.contains_key(name) {
                return Err(error_at(
                    tokens,
                    decl.name,
                    format!("function `{name}` is already defined"),
                ));
            }
            let params = decl
                .params
                .iter()
                .map(|p| Param {
                    name: tokens[p.name].text.clone(),
                    kind: p.kind,
                })
                .collect();
            signatures.insert(name.clone(), params);
        }

        let mut functions = IndexMap::new();
        for decl in &decls {
            let function =
                Codegen::new(tokens, &signatures, &natives, &mut constants).function(decl)?;
            debug!(
                function = %function.name,
                words = function.code.len(),
                locals = function.locals,
                "compiled function"
            );
            functions.insert(function.name.clone(), function);
        }
        functions
    };

    Ok(Program::new(
        functions,
        natives,
        constants,
        lexed.tokens,
        lexed.identifiers,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

struct Codegen<'a> {
    tokens: &'a [Token],
    signatures: &'a IndexMap<String, Vec<Param>>,
    natives: &'a Natives,
    constants: &'a mut Vec<Value>,
    args: IndexMap<String, Word>,
    locals: HashMap<String, Word>,
    next_slot: Word,
    code: Vec<Word>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
}

impl<'a> Codegen<'a> {
    fn new(
        tokens: &'a [Token],
        signatures: &'a IndexMap<String, Vec<Param>>,
        natives: &'a Natives,
        constants: &'a mut Vec<Value>,
    ) -> Self {
        Self {
            tokens,
            signatures,
            natives,
            constants,
            args: IndexMap::new(),
            locals: HashMap::new(),
            next_slot: 0,
            code: Vec::with_capacity(64),
            labels: Vec::new(),
            fixups: Vec::new(),
        }
    }

    fn function(mut self, decl: &FunctionDecl) -> Result<Function> {
        let tokens = self.tokens;
        let name = tokens[decl.name].text.clone();
        for param in &decl.params {
            let text = &tokens[param.name].text;
            if self.args.contains_key(text) {
                return Err(self.error(param.name, format!("duplicate parameter `{text}`")));
            }
            let index = self.args.len() as Word;
            self.args.insert(text.clone(), index);
        }

        self.block(decl.body)?;
        self.resolve_labels();

        let params = self.signatures.get(&name).cloned().unwrap_or_default();
        Ok(Function {
            name,
            params,
            locals: self.next_slot as usize,
            code: self.code,
        })
    }

    fn error(&self, idx: usize, message: impl Into<String>) -> StoneError {
        error_at(self.tokens, idx, message)
    }

    fn emit(&mut self, op: Opcode) -> usize {
        let at = self.code.len();
        self.code.push(op as Word);
        at
    }

    fn emit_word(&mut self, word: Word) {
        self.code.push(word);
    }

    fn emit_operand(&mut self, operand: Operand) {
        self.code.push(operand.mode as Word);
        self.code.push(operand.index);
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    fn emit_jump(&mut self, op: Opcode, label: Label) {
        self.emit(op);
        self.fixups.push((self.code.len(), label));
        self.emit_word(0);
    }

    fn patch(&mut self, pos: usize, target: usize) {
        self.code[pos] = target as Word;
    }

    fn resolve_labels(&mut self) {
        for (pos, label) in std::mem::take(&mut self.fixups) {
            match self.labels[label.0] {
                Some(target) => self.patch(pos, target),
                None => panic!("jump at offset {pos} refers to an unbound label"),
            }
        }
    }

    fn block(&mut self, span: Span) -> Result<()> {
        let tokens = self.tokens;
        let mut cursor = Cursor::new(tokens, span);
        while !cursor.is_empty() {
            let Some((stmt, next)) = recognize_statement(cursor) else {
                let at = cursor.pos();
                return Err(self.error(
                    at,
                    format!("unrecognized statement starting at `{}`", tokens[at].text),
                ));
            };
            self.statement(stmt)?;
            cursor = next;
        }
        Ok(())
    }

    fn statement(&mut self, stmt: Stmt) -> Result<()> {
        match stmt {
            Stmt::Call(call) => self.call(call),
            Stmt::Declare(decl) => self.declare(decl),
            Stmt::Assign(assign) => self.assign(assign),
            Stmt::Arithmetic(arith) => self.arithmetic(arith),
            Stmt::If(node) => self.if_stmt(node),
            Stmt::While(node) => self.while_stmt(node),
        }
    }

    fn call(&mut self, call: Call) -> Result<()> {
        let tokens = self.tokens;
        let name = &tokens[call.callee].text;
        let operands = (call.args.start..call.args.end)
            .map(|idx| self.operand(idx))
            .collect::<Result<Vec<_>>>()?;

        let (op, id) = if let Some((id, _, params)) = self.signatures.get_full(name) {
            if params.len() != operands.len() {
                return Err(self.error(
                    call.callee,
                    format!(
                        "`{name}` expects {} argument(s), found {}",
                        params.len(),
                        operands.len()
                    ),
                ));
            }
            (Opcode::Call, id)
        } else if let Some(id) = self.natives.id_of(name) {
            (Opcode::NativeCall, id)
        } else {
            let tok = &tokens[call.callee];
            return Err(StoneError::UndefinedFunction {
                row: tok.row,
                column: tok.column,
                name: name.clone(),
            });
        };

        self.emit(op);
        self.emit_word(id as Word);
        self.emit_word(operands.len() as Word);
        for operand in operands {
            self.emit_operand(operand);
        }
        Ok(())
    }

    fn declare(&mut self, decl: VarDecl) -> Result<()> {
        let tokens = self.tokens;
        let name = &tokens[decl.name].text;
        if self.args.contains_key(name) {
            return Err(self.error(decl.name, format!("`{name}` is already a parameter")));
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.insert(name.clone(), slot);
        self.emit(Opcode::AllocateVar);
        self.emit_word(decl.kind.code());
        self.emit_word(slot);
        Ok(())
    }

    // Slot of an assignable variable.
    fn target(&self, idx: TokenIdx) -> Result<Word> {
        let name = &self.tokens[idx].text;
        if self.args.contains_key(name) {
            return Err(self.error(idx, format!("cannot assign to parameter `{name}`")));
        }
        match self.locals.get(name) {
            Some(slot) => Ok(*slot),
            None => Err(self.error(idx, format!("unknown variable `{name}`"))),
        }
    }

    fn assign(&mut self, assign: Assign) -> Result<()> {
        let dest = self.target(assign.target)?;
        let src = self.operand(assign.value)?;
        self.emit(Opcode::Assign);
        self.emit_word(dest);
        self.emit_operand(src);
        Ok(())
    }

    fn arithmetic(&mut self, arith: Arithmetic) -> Result<()> {
        let dest = self.target(arith.target)?;
        let left = self.operand(arith.left)?;
        let right = self.operand(arith.right)?;
        self.emit(arith_opcode(arith.op));
        self.emit_operand(left);
        self.emit_operand(right);
        self.emit(Opcode::Assign);
        self.emit_word(dest);
        self.emit_operand(Operand::accumulator());
        Ok(())
    }

    /// Emits every comparison in `span`; only the last one decides the
    /// following branch.
    fn conditions(&mut self, span: Span) -> Result<()> {
        if span.is_empty() {
            return Err(self.error(span.start.saturating_sub(1), "empty condition"));
        }
        let tokens = self.tokens;
        let mut cursor = Cursor::new(tokens, span);
        while !cursor.is_empty() {
            let Some((cmp, next)) = recognize_comparison(cursor) else {
                return Err(self.error(cursor.pos(), "expected a comparison"));
            };
            let left = self.operand(cmp.left)?;
            let right = self.operand(cmp.right)?;
            self.emit(compare_opcode(cmp.op));
            self.emit_operand(left);
            self.emit_operand(right);
            cursor = next;
        }
        Ok(())
    }

    fn if_stmt(&mut self, node: If) -> Result<()> {
        self.conditions(node.condition)?;
        let otherwise = self.new_label();
        self.emit_jump(Opcode::JumpIfFalse, otherwise);
        self.block(node.body)?;
        match node.otherwise {
            Some(body) => {
                let end = self.new_label();
                self.emit_jump(Opcode::Jump, end);
                self.bind(otherwise);
                self.block(body)?;
                self.bind(end);
            }
            None => self.bind(otherwise),
        }
        Ok(())
    }

    fn while_stmt(&mut self, node: While) -> Result<()> {
        let entry = self.new_label();
        self.bind(entry);
        self.conditions(node.condition)?;
        let exit = self.new_label();
        self.emit_jump(Opcode::JumpIfFalse, exit);
        self.block(node.body)?;
        self.emit_jump(Opcode::Jump, entry);
        self.bind(exit);
        Ok(())
    }

    fn constant(&mut self, value: Value) -> Operand {
        self.constants.push(value);
        Operand::constant((self.constants.len() - 1) as Word)
    }

    /// Resolves a token to storage: parameters, then locals, then literals.
    fn operand(&mut self, idx: TokenIdx) -> Result<Operand> {
        let tokens = self.tokens;
        let tok = &tokens[idx];
        match tok.kind {
            TokenType::Identifier => {
                if let Some(index) = self.args.get(&tok.text) {
                    Ok(Operand::arg(*index))
                } else if let Some(slot) = self.locals.get(&tok.text) {
                    Ok(Operand::local(*slot))
                } else {
                    Err(self.error(idx, format!("unknown variable `{}`", tok.text)))
                }
            }
            TokenType::Literal => match tok.sub {
                SubType::Integer => match tok.text.parse::<i64>() {
                    Ok(i) => Ok(self.constant(Value::Int(i))),
                    Err(_) => Err(self.error(
                        idx,
                        format!("integer literal `{}` is out of range", tok.text),
                    )),
                },
                SubType::String => {
                    let text = tok.text.clone();
                    Ok(self.constant(Value::Str(text)))
                }
                _ => Err(self.error(
                    idx,
                    format!("literal `{}` has no runtime value kind", tok.text),
                )),
            },
            _ => Err(self.error(
                idx,
                format!("expected a variable or literal, found `{}`", tok.text),
            )),
        }
    }
}
