use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures keep their defining scope alive
/// through this handle after the block that created it has finished.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &Env) -> Env {
        Rc::new(RefCell::new(Self::with_enclosing(Rc::clone(enclosing))))
    }

    pub fn enclosing(&self) -> Option<&Env> {
        self.enclosing.as_ref()
    }

    /// Bind `name` in this scope, replacing any existing binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then in each enclosing scope in turn.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Read `name` from the scope exactly `distance` links up the chain.
    /// `None` means the resolver and the runtime disagree about the chain.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        if distance == 0 {
            self.values.get(name).cloned()
        } else {
            self.enclosing.as_ref()?.borrow().get_at(distance - 1, name)
        }
    }

    /// Overwrite `name` exactly `distance` links up the chain.  Returns
    /// whether the binding was found.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) -> bool {
        if distance == 0 {
            match self.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        } else {
            match &self.enclosing {
                Some(enclosing) => enclosing.borrow_mut().assign_at(distance - 1, name, value),
                None => false,
            }
        }
    }
}

pub(crate) fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
