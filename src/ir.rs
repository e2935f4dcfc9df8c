// src/ir.rs
//! Flat instruction encoding. A function's code is a `Vec<u32>`: an opcode
//! followed by its operands. Operand layouts:
//!
//! | opcode                         | operands                                   |
//! |--------------------------------|--------------------------------------------|
//! | `Call`, `NativeCall`           | function id, argc, argc × (mode, index)    |
//! | `AllocateVar`                  | value kind, slot                           |
//! | `Assign`                       | dest slot, mode, index                     |
//! | `Add` `Subtract` `Multiply` `Divide` | mode, index, mode, index (into accumulator) |
//! | `Equal` … `LessOrEqual`        | mode, index, mode, index (into flag)       |
//! | `JumpIfFalse`, `Jump`          | target offset                              |

use std::fmt;

use crate::value::ValueKind;

pub type Word = u32;

/// Index of the accumulator in the register file.
pub const ACCUMULATOR: Word = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    Call = 1,
    NativeCall,
    AllocateVar,
    Assign,
    Equal,
    NotEqual,
    More,
    MoreOrEqual,
    Less,
    LessOrEqual,
    JumpIfFalse,
    Jump,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Opcode {
    const ALL: [Opcode; 16] = [
        Opcode::Call,
        Opcode::NativeCall,
        Opcode::AllocateVar,
        Opcode::Assign,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::More,
        Opcode::MoreOrEqual,
        Opcode::Less,
        Opcode::LessOrEqual,
        Opcode::JumpIfFalse,
        Opcode::Jump,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Divide,
    ];

    pub fn from_word(word: Word) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as Word == word)
    }
}

/// Which storage an operand index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AddressingMode {
    UserVar = 0,
    ConstVar = 1,
    ArgVar = 2,
    Register = 3,
}

impl AddressingMode {
    pub fn from_word(word: Word) -> Option<Self> {
        Some(match word {
            0 => AddressingMode::UserVar,
            1 => AddressingMode::ConstVar,
            2 => AddressingMode::ArgVar,
            3 => AddressingMode::Register,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub mode: AddressingMode,
    pub index: Word,
}

impl Operand {
    pub fn new(mode: AddressingMode, index: Word) -> Self {
        Self { mode, index }
    }

    pub fn local(slot: Word) -> Self {
        Self::new(AddressingMode::UserVar, slot)
    }

    pub fn constant(index: Word) -> Self {
        Self::new(AddressingMode::ConstVar, index)
    }

    pub fn arg(index: Word) -> Self {
        Self::new(AddressingMode::ArgVar, index)
    }

    pub fn accumulator() -> Self {
        Self::new(AddressingMode::Register, ACCUMULATOR)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mode {
            AddressingMode::UserVar => write!(f, "local[{}]", self.index),
            AddressingMode::ConstVar => write!(f, "const[{}]", self.index),
            AddressingMode::ArgVar => write!(f, "arg[{}]", self.index),
            AddressingMode::Register => write!(f, "acc"),
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Call { function: Word, args: Vec<Operand> },
    NativeCall { function: Word, args: Vec<Operand> },
    AllocateVar { kind: ValueKind, slot: Word },
    Assign { dest: Word, src: Operand },
    Arith { op: Opcode, left: Operand, right: Operand },
    Compare { op: Opcode, left: Operand, right: Operand },
    JumpIfFalse { target: Word },
    Jump { target: Word },
}

/// Panics on malformed code: the stream is produced by our own compiler, so
/// a bad word here is a code generation defect.
fn word(code: &[Word], at: usize) -> Word {
    match code.get(at) {
        Some(w) => *w,
        None => panic!("instruction stream truncated at offset {at}"),
    }
}

fn operand(code: &[Word], at: usize) -> Operand {
    let raw = word(code, at);
    let Some(mode) = AddressingMode::from_word(raw) else {
        panic!("invalid addressing mode {raw} at offset {at}");
    };
    Operand::new(mode, word(code, at + 1))
}

impl Instruction {
    /// Decodes the instruction at `pc`, returning it with the offset of the
    /// next instruction.
    pub fn decode(code: &[Word], pc: usize) -> (Instruction, usize) {
        let raw = word(code, pc);
        let Some(op) = Opcode::from_word(raw) else {
            panic!("invalid opcode {raw} at offset {pc}");
        };
        match op {
            Opcode::Call | Opcode::NativeCall => {
                let function = word(code, pc + 1);
                let argc = word(code, pc + 2) as usize;
                let args = (0..argc).map(|i| operand(code, pc + 3 + i * 2)).collect();
                let next = pc + 3 + argc * 2;
                if op == Opcode::Call {
                    (Instruction::Call { function, args }, next)
                } else {
                    (Instruction::NativeCall { function, args }, next)
                }
            }
            Opcode::AllocateVar => {
                let raw_kind = word(code, pc + 1);
                let Some(kind) = ValueKind::from_code(raw_kind) else {
                    panic!("invalid value kind {raw_kind} at offset {pc}");
                };
                let slot = word(code, pc + 2);
                (Instruction::AllocateVar { kind, slot }, pc + 3)
            }
            Opcode::Assign => {
                let dest = word(code, pc + 1);
                let src = operand(code, pc + 2);
                (Instruction::Assign { dest, src }, pc + 4)
            }
            Opcode::Add | Opcode::Subtract | Opcode::Multiply | Opcode::Divide => {
                let left = operand(code, pc + 1);
                let right = operand(code, pc + 3);
                (Instruction::Arith { op, left, right }, pc + 5)
            }
            Opcode::Equal
            | Opcode::NotEqual
            | Opcode::More
            | Opcode::MoreOrEqual
            | Opcode::Less
            | Opcode::LessOrEqual => {
                let left = operand(code, pc + 1);
                let right = operand(code, pc + 3);
                (Instruction::Compare { op, left, right }, pc + 5)
            }
            Opcode::JumpIfFalse => (
                Instruction::JumpIfFalse {
                    target: word(code, pc + 1),
                },
                pc + 2,
            ),
            Opcode::Jump => (
                Instruction::Jump {
                    target: word(code, pc + 1),
                },
                pc + 2,
            ),
        }
    }
}

/// Decodes a whole function body into `(offset, instruction)` pairs.
pub fn decode_all(code: &[Word]) -> Vec<(usize, Instruction)> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let (ins, next) = Instruction::decode(code, pc);
        out.push((pc, ins));
        pc = next;
    }
    out
}

fn join(args: &[Operand]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Call { function, args } => {
                write!(f, "Call fn#{} ({})", function, join(args))
            }
            Instruction::NativeCall { function, args } => {
                write!(f, "NativeCall native#{} ({})", function, join(args))
            }
            Instruction::AllocateVar { kind, slot } => {
                write!(f, "AllocateVar {} -> local[{}]", kind, slot)
            }
            Instruction::Assign { dest, src } => write!(f, "Assign local[{}] <- {}", dest, src),
            Instruction::Arith { op, left, right } => {
                write!(f, "{:?} {}, {} -> acc", op, left, right)
            }
            Instruction::Compare { op, left, right } => {
                write!(f, "{:?} {}, {} -> flag", op, left, right)
            }
            Instruction::JumpIfFalse { target } => write!(f, "JumpIfFalse {:04}", target),
            Instruction::Jump { target } => write!(f, "Jump {:04}", target),
        }
    }
}

/// Human-readable listing, one instruction per line.
pub fn disassemble(code: &[Word]) -> String {
    decode_all(code)
        .into_iter()
        .map(|(pc, ins)| format!("{:04}  {}\n", pc, ins))
        .collect()
}
