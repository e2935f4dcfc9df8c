// src/vm.rs
//! Accumulator machine. Each call gets its own program counter, accumulator
//! and comparison flag; locals and arguments live in a [`Frame`].

use tracing::trace;

use crate::ir::{AddressingMode, Instruction, Opcode, Operand};
use crate::registry::Program;
use crate::value::Value;

/// Storage for one activation: declared locals and the argument values the
/// caller passed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    locals: Vec<Value>,
    args: Vec<Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(args: Vec<Value>) -> Self {
        Self {
            locals: Vec::new(),
            args,
        }
    }

    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    pub fn local(&self, slot: usize) -> Option<&Value> {
        self.locals.get(slot)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut [Value] {
        &mut self.args
    }
}

// Per-call registers.
struct Activation {
    pc: usize,
    accumulator: Value,
    flag: bool,
}

pub struct VM<'p> {
    program: &'p Program,
}

impl<'p> VM<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    fn fetch<'a>(&'a self, frame: &'a Frame, acc: &'a Value, op: Operand) -> &'a Value {
        let index = op.index as usize;
        match op.mode {
            AddressingMode::UserVar => &frame.locals[index],
            AddressingMode::ConstVar => self.program.constant(index),
            AddressingMode::ArgVar => &frame.args[index],
            AddressingMode::Register => acc,
        }
    }

    fn collect_args(&self, frame: &Frame, acc: &Value, operands: &[Operand]) -> Vec<Value> {
        operands
            .iter()
            .map(|op| self.fetch(frame, acc, *op).clone())
            .collect()
    }

    /// Runs user function `id` to the end of its code.
    pub fn call(&self, id: usize, frame: &mut Frame) {
        let function = self.program.function_by_id(id);
        let code = &function.code;
        if frame.locals.len() < function.locals {
            frame.locals.resize(function.locals, Value::None);
        }

        let mut act = Activation {
            pc: 0,
            accumulator: Value::None,
            flag: false,
        };

        while act.pc < code.len() {
            let (ins, next) = Instruction::decode(code, act.pc);
            trace!(function = %function.name, pc = act.pc, instruction = %ins, "exec");
            act.pc = next;

            match ins {
                Instruction::Call { function, args } => {
                    let args = self.collect_args(frame, &act.accumulator, &args);
                    let mut callee = Frame::with_args(args);
                    self.call(function as usize, &mut callee);
                }
                Instruction::NativeCall { function, args } => {
                    let native = match self.program.natives().get(function as usize) {
                        Some(native) => native,
                        None => panic!("native id {function} out of range"),
                    };
                    let mut values = self.collect_args(frame, &act.accumulator, &args);
                    native.call(&mut values);
                    // Natives may fill their arguments; copy them back to the
                    // caller's variables.
                    for (op, value) in args.iter().zip(values) {
                        if op.mode == AddressingMode::UserVar {
                            frame.locals[op.index as usize] = value;
                        }
                    }
                }
                Instruction::AllocateVar { kind, slot } => {
                    frame.locals[slot as usize] = kind.default_value();
                }
                Instruction::Assign { dest, src } => {
                    let value = self.fetch(frame, &act.accumulator, src).clone();
                    frame.locals[dest as usize] = value;
                }
                Instruction::Arith { op, left, right } => {
                    let l = self.fetch(frame, &act.accumulator, left);
                    let r = self.fetch(frame, &act.accumulator, right);
                    let result = match op {
                        Opcode::Add => Value::add(l, r),
                        Opcode::Subtract => Value::subtract(l, r),
                        Opcode::Multiply => Value::multiply(l, r),
                        Opcode::Divide => Value::divide(l, r),
                        other => panic!("{other:?} is not an arithmetic opcode"),
                    };
                    act.accumulator = result;
                }
                Instruction::Compare { op, left, right } => {
                    let l = self.fetch(frame, &act.accumulator, left);
                    let r = self.fetch(frame, &act.accumulator, right);
                    act.flag = match op {
                        Opcode::Equal => l.equals(r),
                        Opcode::NotEqual => !l.equals(r),
                        Opcode::More => l.more(r),
                        Opcode::MoreOrEqual => l.more_or_equal(r),
                        Opcode::Less => l.less(r),
                        Opcode::LessOrEqual => l.less_or_equal(r),
                        other => panic!("{other:?} is not a comparison opcode"),
                    };
                }
                Instruction::JumpIfFalse { target } => {
                    if !act.flag {
                        act.pc = target as usize;
                    }
                }
                Instruction::Jump { target } => act.pc = target as usize,
            }
        }
    }
}
