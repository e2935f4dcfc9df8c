// src/value.rs
use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

/// Placeholder produced by string arithmetic other than concatenation.
pub const NOT_SUPPORTED: &str = "Not supported operation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    Str,
    Int,
    Bool,
}

impl ValueKind {
    /// Encoding used by `AllocateVar` operands.
    pub fn code(self) -> u32 {
        match self {
            ValueKind::None => 0,
            ValueKind::Str => 1,
            ValueKind::Int => 2,
            ValueKind::Bool => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => ValueKind::None,
            1 => ValueKind::Str,
            2 => ValueKind::Int,
            3 => ValueKind::Bool,
            _ => return None,
        })
    }

    /// Initial contents of a freshly allocated variable cell.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::None => Value::None,
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Int => Value::Int(0),
            ValueKind::Bool => Value::Bool(false),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::None => "none",
            ValueKind::Str => "string",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A script value. The variant is authoritative: binary operations only
/// combine values of the same variant and degrade quietly otherwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Str(String),
    Int(i64),
    Bool(bool),
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Str(_) => ValueKind::Str,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            _ => "",
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn set_str(&mut self, s: impl Into<String>) {
        *self = Value::Str(s.into());
    }

    pub fn set_int(&mut self, i: i64) {
        *self = Value::Int(i);
    }

    pub fn set_bool(&mut self, b: bool) {
        *self = Value::Bool(b);
    }

    pub fn add(left: &Value, right: &Value) -> Value {
        arith(left, right, Arith::Add)
    }

    pub fn subtract(left: &Value, right: &Value) -> Value {
        arith(left, right, Arith::Subtract)
    }

    pub fn multiply(left: &Value, right: &Value) -> Value {
        arith(left, right, Arith::Multiply)
    }

    pub fn divide(left: &Value, right: &Value) -> Value {
        arith(left, right, Arith::Divide)
    }

    pub fn equals(&self, other: &Value) -> bool {
        self.ordering(other) == Some(Ordering::Equal)
    }

    pub fn more(&self, other: &Value) -> bool {
        self.ordering(other) == Some(Ordering::Greater)
    }

    pub fn more_or_equal(&self, other: &Value) -> bool {
        matches!(self.ordering(other), Some(Ordering::Greater | Ordering::Equal))
    }

    pub fn less(&self, other: &Value) -> bool {
        self.ordering(other) == Some(Ordering::Less)
    }

    pub fn less_or_equal(&self, other: &Value) -> bool {
        matches!(self.ordering(other), Some(Ordering::Less | Ordering::Equal))
    }

    // `None` for mismatched variants and for two `None` values.
    fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn arith(left: &Value, right: &Value, op: Arith) -> Value {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => match op {
            Arith::Add => Value::Str(format!("{a}{b}")),
            _ => Value::Str(NOT_SUPPORTED.to_string()),
        },
        (Value::Int(a), Value::Int(b)) => match op {
            Arith::Add => Value::Int(a.wrapping_add(*b)),
            Arith::Subtract => Value::Int(a.wrapping_sub(*b)),
            Arith::Multiply => Value::Int(a.wrapping_mul(*b)),
            Arith::Divide => match a.checked_div(*b) {
                Some(q) => Value::Int(q),
                None => {
                    warn!(left = a, right = b, "integer division by zero or overflow");
                    Value::None
                }
            },
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            Arith::Add => Value::Bool(*a || *b),
            Arith::Subtract => Value::Bool(a != b),
            Arith::Multiply => Value::Bool(*a && *b),
            Arith::Divide if *b => Value::Bool(*a),
            Arith::Divide => {
                warn!("boolean division by false");
                Value::None
            }
        },
        _ => Value::None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", u8::from(*b)),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
