//! The array container: a double-ended sequence of values whose methods are
//! reached through property access, as in `arr.append(1)`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::Callable;
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{format_bool, Value};

#[derive(Default)]
pub struct LoxArray {
    items: RefCell<VecDeque<Value>>,
}

impl LoxArray {
    /// An array of `size` nils.
    pub fn with_size(size: usize) -> Self {
        Self::from_values(std::iter::repeat(Value::Nil).take(size))
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: RefCell::new(values.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// A snapshot of the current contents.
    pub fn values(&self) -> Vec<Value> {
        self.items.borrow().iter().cloned().collect()
    }

    /// Look up a method by name, bound to `array`.  `name` positions any error
    /// the method later raises.
    pub fn get(array: &Rc<LoxArray>, name: &Token) -> Result<Value> {
        let Some(method) = ArrayMethodKind::from_name(&name.lexeme) else {
            return Err(LoxError::runtime(
                name,
                format!("Undefined method: '{}'.", name.lexeme),
            ));
        };

        Ok(Value::ArrayMethod(Rc::new(ArrayMethod {
            array: Rc::clone(array),
            method,
            token: name.clone(),
        })))
    }

    /// Resolve a possibly negative index against the current length.
    fn position(&self, index: &Value) -> std::result::Result<Option<usize>, String> {
        let Value::Int(i) = index else {
            return Err(format!(
                "Array indices must be integers, not {}.",
                index.type_name()
            ));
        };

        let len = self.len() as i64;
        let i = if *i < 0 { *i + len } else { *i };

        Ok((0..len).contains(&i).then_some(i as usize))
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const LoxArray>) -> fmt::Result {
        if open.contains(&(self as *const LoxArray)) {
            return f.write_str("[...]");
        }
        open.push(self);

        f.write_str("[")?;
        for (i, item) in self.items.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match item {
                Value::Array(inner) => inner.fmt_nested(f, open)?,
                other => write_element(f, other)?,
            }
        }
        f.write_str("]")?;

        open.pop();
        Ok(())
    }
}

/// Elements print the way they would be written as literals: strings quoted,
/// everything else as usual.
fn write_element(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => f.write_str(&quoted(s)),
        Value::Bool(b) => f.write_str(format_bool(*b)),
        other => write!(f, "{}", other),
    }
}

/// Single quotes unless the text holds a single quote and no double quote.
fn quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);

    out
}

impl fmt::Display for LoxArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, &mut Vec::new())
    }
}

impl fmt::Debug for LoxArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// ───────────────────────────── methods ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMethodKind {
    Get,
    Set,
    Append,
    AppendLeft,
    Pop,
    PopLeft,
    Clear,
    Reverse,
    Join,
    Slice,
}

impl ArrayMethodKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "get" => Self::Get,
            "set" => Self::Set,
            "append" => Self::Append,
            "appendleft" => Self::AppendLeft,
            "pop" => Self::Pop,
            "popleft" => Self::PopLeft,
            "clear" => Self::Clear,
            "reverse" => Self::Reverse,
            "join" => Self::Join,
            "slice" => Self::Slice,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Append => "append",
            Self::AppendLeft => "appendleft",
            Self::Pop => "pop",
            Self::PopLeft => "popleft",
            Self::Clear => "clear",
            Self::Reverse => "reverse",
            Self::Join => "join",
            Self::Slice => "slice",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Pop | Self::PopLeft | Self::Clear | Self::Reverse => 0,
            Self::Get | Self::Append | Self::AppendLeft | Self::Join => 1,
            Self::Set => 2,
            Self::Slice => 3,
        }
    }
}

/// A method looked up on a particular array.
pub struct ArrayMethod {
    array: Rc<LoxArray>,
    method: ArrayMethodKind,
    token: Token,
}

impl ArrayMethod {
    fn apply(&self, mut arguments: Vec<Value>) -> std::result::Result<Value, String> {
        let array = &self.array;

        match self.method {
            ArrayMethodKind::Get => match array.position(&arguments[0])? {
                Some(i) => Ok(array.items.borrow()[i].clone()),
                None => Err("Index out of range.".to_string()),
            },

            ArrayMethodKind::Set => {
                let value = arguments.pop().unwrap_or(Value::Nil);
                match array.position(&arguments[0])? {
                    Some(i) => {
                        array.items.borrow_mut()[i] = value;
                        Ok(Value::Nil)
                    }
                    None => Err("Assignment index out of range.".to_string()),
                }
            }

            ArrayMethodKind::Append => {
                array.items.borrow_mut().extend(arguments);
                Ok(Value::Nil)
            }

            ArrayMethodKind::AppendLeft => {
                let mut items = array.items.borrow_mut();
                for value in arguments {
                    items.push_front(value);
                }
                Ok(Value::Nil)
            }

            ArrayMethodKind::Pop => array
                .items
                .borrow_mut()
                .pop_back()
                .ok_or_else(|| "Cannot pop from empty array.".to_string()),

            ArrayMethodKind::PopLeft => array
                .items
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| "Cannot pop from empty array.".to_string()),

            ArrayMethodKind::Clear => {
                array.items.borrow_mut().clear();
                Ok(Value::Nil)
            }

            ArrayMethodKind::Reverse => {
                array.items.borrow_mut().make_contiguous().reverse();
                Ok(Value::Nil)
            }

            ArrayMethodKind::Join => {
                let Value::Str(separator) = &arguments[0] else {
                    return Err(format!(
                        "join() separator must be a string, not {}.",
                        arguments[0].type_name()
                    ));
                };

                let items = array.items.borrow();
                let mut parts: Vec<&str> = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Str(s) => parts.push(s),
                        other => {
                            return Err(format!(
                                "Sequence item {}: expected string, {} found.",
                                i,
                                other.type_name()
                            ))
                        }
                    }
                }

                Ok(Value::Str(parts.join(separator)))
            }

            ArrayMethodKind::Slice => {
                let start = slice_index(&arguments[0])?.unwrap_or(0);
                let stop = slice_index(&arguments[1])?;
                let step = match slice_index(&arguments[2])? {
                    Some(0) => {
                        return Err("Step for slice() must be a positive integer or nil.".to_string())
                    }
                    step => step.unwrap_or(1),
                };

                let items = array.items.borrow();
                let stop = stop.unwrap_or(items.len()).min(items.len());
                let picked = items
                    .iter()
                    .take(stop)
                    .skip(start)
                    .step_by(step)
                    .cloned();

                Ok(Value::Array(Rc::new(LoxArray::from_values(picked))))
            }
        }
    }
}

/// `nil` or a non-negative integer.
fn slice_index(value: &Value) -> std::result::Result<Option<usize>, String> {
    match value {
        Value::Nil => Ok(None),
        Value::Int(n) if *n >= 0 => Ok(Some(*n as usize)),
        _ => Err("Indices for slice() must be nil or non-negative integers.".to_string()),
    }
}

impl Callable for ArrayMethod {
    fn arity(&self) -> usize {
        self.method.arity()
    }

    fn name(&self) -> &str {
        self.method.name()
    }

    fn call_unchecked(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _paren: &Token,
    ) -> Result<Value> {
        debug!("Calling array method '{}'", self.method.name());

        self.apply(arguments)
            .map_err(|message| LoxError::runtime(&self.token, message))
    }
}

impl ArrayMethod {
    pub fn same_as(&self, other: &ArrayMethod) -> bool {
        Rc::ptr_eq(&self.array, &other.array) && self.method == other.method
    }
}

impl fmt::Debug for ArrayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin fn {}>", self.method.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> LoxArray {
        LoxArray::from_values(items.iter().map(|s| Value::Str(s.to_string())))
    }

    #[test]
    fn sized_arrays_start_as_nils() {
        assert_eq!(LoxArray::with_size(2).to_string(), "[nil, nil]");
        assert!(LoxArray::with_size(0).is_empty());
    }

    #[test]
    fn strings_are_quoted_inside_arrays() {
        assert_eq!(strs(&["a", "it's"]).to_string(), "['a', \"it's\"]");
        assert_eq!(strs(&["line\n"]).to_string(), "['line\\n']");
    }

    #[test]
    fn scalars_inside_arrays() {
        let array = LoxArray::from_values([
            Value::Bool(true),
            Value::Int(3),
            Value::Float(0.5),
            Value::Nil,
        ]);

        assert_eq!(array.to_string(), "[True, 3, 0.5, nil]");
    }

    #[test]
    fn self_containing_array_prints_an_ellipsis() {
        let outer = Rc::new(LoxArray::with_size(1));
        outer.items.borrow_mut().push_back(Value::Array(Rc::clone(&outer)));

        assert_eq!(outer.to_string(), "[nil, [...]]");

        // Break the cycle so the test does not leak.
        outer.items.borrow_mut().clear();
    }
}
