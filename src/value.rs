//! Runtime values.
//!
//! Numbers keep the integer/float split made by the scanner: integer
//! arithmetic stays integral until it overflows, and any float operand makes
//! the result a float.  Equality is type-gated, so `1 == 1.0` and
//! `1 == true` are both false.

use std::fmt;
use std::rc::Rc;

use crate::array::{ArrayMethod, LoxArray};
use crate::callable::{Callable, LoxClass, LoxFunction, LoxInstance, NativeFunction};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Array(Rc<LoxArray>),
    ArrayMethod(Rc<ArrayMethod>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Integers and floats.  Booleans are not numbers.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as something that can be called, if it is one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Native(native) => Some(&**native),
            Value::Function(function) => Some(&**function),
            Value::Class(class) => Some(class),
            Value::ArrayMethod(method) => Some(&**method),
            _ => None,
        }
    }

    /// Name of the runtime type, used in builtin error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Native(_) | Value::Function(_) | Value::ArrayMethod(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same_as(b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::ArrayMethod(a), Value::ArrayMethod(b)) => a.same_as(b),
            _ => false,
        }
    }
}

pub fn format_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Floats print in shortest round-trip form with a fractional part, except
/// for the non-finite values.  Exponents carry a sign and at least two
/// digits: `1e+16`, `1e-05`.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        let s = if n > 0.0 { "inf" } else { "-inf" };
        return s.to_string();
    }

    let shortest = format!("{:?}", n);
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => shortest,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => f.write_str(format_bool(*b)),

            Value::Int(n) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            Value::Float(n) => f.write_str(&format_float(*n)),

            Value::Str(s) => write!(f, "{}", s),

            Value::Native(native) => write!(f, "<builtin fn {}>", native.name()),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "<cls {}>", class.name),

            Value::Instance(instance) => write!(f, "<inst {}>", instance.class().name),

            Value::Array(array) => write!(f, "{}", array),

            Value::ArrayMethod(method) => write!(f, "<builtin fn {}>", method.name()),
        }
    }
}
