//! Callable runtime objects: native functions, user functions (plain or bound
//! to an instance), classes, and the instances classes produce.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{Env, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Anything a call expression can invoke.
pub trait Callable {
    fn arity(&self) -> usize;

    fn name(&self) -> &str;

    /// Invoke with an argument list already known to match [`arity`](Self::arity).
    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value>;

    /// Check the argument count, then invoke.  Errors are positioned at the
    /// call's closing parenthesis.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        let arity = self.arity();

        if arguments.len() != arity {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    arity,
                    arguments.len()
                ),
            ));
        }

        self.call_unchecked(interpreter, arguments, paren)
    }
}

// ───────────────────────────── native functions ─────────────────────────────

/// Host function signature: failures carry a message only; the caller adds
/// the position.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn name(&self) -> &str {
        self.name
    }

    fn call_unchecked(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Calling builtin '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

// ───────────────────────────── user functions ───────────────────────────────

pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Env,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// A copy of this method whose closure binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let env: Env = Environment::child_of(&self.closure);
        env.borrow_mut().define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    /// Same declaration, and either the same closure or two bindings of the
    /// same method to the same receiver.
    pub fn same_as(&self, other: &LoxFunction) -> bool {
        if !Rc::ptr_eq(&self.declaration, &other.declaration) {
            return false;
        }

        if Rc::ptr_eq(&self.closure, &other.closure) {
            return true;
        }

        let (mine, theirs) = (self.closure.borrow(), other.closure.borrow());

        match (mine.enclosing(), theirs.enclosing()) {
            (Some(a), Some(b)) if Rc::ptr_eq(a, b) => match (
                mine.get_at(0, "this"),
                theirs.get_at(0, "this"),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }

    fn this(&self) -> Value {
        self.closure
            .borrow()
            .get_at(0, "this")
            .unwrap_or(Value::Nil)
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _paren: &Token,
    ) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let env: Env = Environment::child_of(&self.closure);
        {
            let mut scope = env.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                scope.define(&param.lexeme, argument);
            }
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(self.this());
        }

        Ok(match flow {
            Flow::Return(value) => value,
            _ => Value::Nil,
        })
    }
}

// ───────────────────────────── classes ──────────────────────────────────────

pub struct LoxClass {
    pub name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Own methods first, then each superclass in turn.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<cls {}>", self.name)
    }
}

/// Calling a class builds an instance and runs `init` on it, if any class in
/// the chain defines one.
impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Rc::clone(self)));

        if let Some(init) = self.find_method("init") {
            init.bind(Rc::clone(&instance))
                .call_unchecked(interpreter, arguments, paren)?;
        }

        Ok(Value::Instance(instance))
    }
}

// ───────────────────────────── instances ────────────────────────────────────

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Fields shadow methods; methods come back bound to `instance`.
    pub fn get(instance: &Rc<LoxInstance>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match instance.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance))))),
            None => Err(LoxError::runtime(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<inst {}>", self.class.name)
    }
}
