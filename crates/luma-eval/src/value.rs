//! Runtime values and their JavaScript-flavoured coercions.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use luma_types::ast::{BinOp, FunctionDecl};

use crate::builtins::Builtin;

/// Shared, mutable array storage. Arrays have reference semantics.
pub type ArrayRef = Arc<Mutex<Vec<Value>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Math,
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(ArrayRef),
    Function(Arc<FunctionDecl>),
    Builtin(Builtin),
    Namespace(Namespace),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Arc::new(Mutex::new(items)))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) | Value::Builtin(_) => "function",
            Value::Namespace(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_string()),
            Value::Function(_) | Value::Builtin(_) | Value::Namespace(_) => f64::NAN,
        }
    }

    /// `ToInt32`: wraps modulo 2^32, non-finite values become 0.
    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        (n.trunc().rem_euclid(4_294_967_296.0) as u32) as i32
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::Str(_)) | (Value::Str(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Array(_), Value::Number(_) | Value::Str(_)) => {
                Value::str(self.to_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::Str(_), Value::Array(_)) => {
                self.loose_equals(&Value::str(other.to_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Apply a non-short-circuiting binary operator.
    pub fn binary(op: BinOp, left: &Value, right: &Value) -> Value {
        match op {
            BinOp::Add => add(left, right),
            BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
            BinOp::Eq => Value::Bool(left.loose_equals(right)),
            BinOp::NotEq => Value::Bool(!left.loose_equals(right)),
            BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
            BinOp::Less => compare(left, right, |a, b| a < b, |a, b| a < b),
            BinOp::Greater => compare(left, right, |a, b| a > b, |a, b| a > b),
            BinOp::LessEq => compare(left, right, |a, b| a <= b, |a, b| a <= b),
            BinOp::GreaterEq => compare(left, right, |a, b| a >= b, |a, b| a >= b),
            BinOp::BitAnd => int32(left.to_int32() & right.to_int32()),
            BinOp::BitOr => int32(left.to_int32() | right.to_int32()),
            BinOp::BitXor => int32(left.to_int32() ^ right.to_int32()),
            BinOp::Shl => int32(left.to_int32().wrapping_shl(shift_count(right))),
            BinOp::Shr => int32(left.to_int32().wrapping_shr(shift_count(right))),
        }
    }
}

fn int32(n: i32) -> Value {
    Value::Number(f64::from(n))
}

fn shift_count(v: &Value) -> u32 {
    (v.to_int32() as u32) & 31
}

fn is_stringy(v: &Value) -> bool {
    matches!(v, Value::Str(_) | Value::Array(_))
}

fn add(left: &Value, right: &Value) -> Value {
    if is_stringy(left) || is_stringy(right) {
        Value::Str(format!("{left}{right}"))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

fn compare(
    left: &Value,
    right: &Value,
    num: fn(f64, f64) -> bool,
    text: fn(&str, &str) -> bool,
) -> Value {
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Value::Bool(text(a, b));
    }
    // NaN compares false under every operator.
    Value::Bool(num(left.to_number(), right.to_number()))
}

/// String to number the way `Number(s)` does it.
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Number to string the way `String(n)` does it for everyday values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

pub(crate) fn lock_array(items: &ArrayRef) -> MutexGuard<'_, Vec<Value>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                // A self-containing array prints its inner reference as empty.
                let items = match items.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => return Ok(()),
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::Undefined | Value::Null => {}
                        other => write!(f, "{other}")?,
                    }
                }
                Ok(())
            }
            Value::Function(decl) => write!(f, "function {}() {{ ... }}", decl.name.name),
            Value::Builtin(b) => write!(f, "function {}() {{ [native code] }}", b.name()),
            Value::Namespace(Namespace::Math) => write!(f, "[object Math]"),
        }
    }
}
