// src/ast.rs
//! Records produced by the recognizers. Operands and names are indices into
//! the token stream; the code generator resolves them to storage.

use crate::value::ValueKind;

/// Half-open range of token indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

pub type TokenIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    More,
    MoreOrEqual,
    Less,
    LessOrEqual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: TokenIdx,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: TokenIdx,
    pub params: Vec<Param>,
    pub args: Span,
    pub body: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub callee: TokenIdx,
    pub args: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDecl {
    pub name: TokenIdx,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assign {
    pub target: TokenIdx,
    pub value: TokenIdx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arithmetic {
    pub target: TokenIdx,
    pub left: TokenIdx,
    pub op: ArithOp,
    pub right: TokenIdx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compare {
    pub left: TokenIdx,
    pub op: CompareOp,
    pub right: TokenIdx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct If {
    pub condition: Span,
    pub body: Span,
    pub otherwise: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct While {
    pub condition: Span,
    pub body: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stmt {
    Call(Call),
    Declare(VarDecl),
    Assign(Assign),
    Arithmetic(Arithmetic),
    If(If),
    While(While),
}
