use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::array::LoxArray;
use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::builtins::load_builtins;
use crate::callable::{LoxClass, LoxFunction, LoxInstance};
use crate::environment::{undefined_variable, Env, Environment};
use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.  `Return`, `Break` and `Continue` travel up the
/// call chain until a function call or loop consumes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: Env,
    environment: Env,
    /// Hop counts recorded by the resolver.  Ids missing here are globals.
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout, with the builtins loaded.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` statements write to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        load_builtins(&globals);

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record that the variable expression `id` lives `depth` scopes out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Resolved {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Run a program.  The first runtime error is reported and ends the run.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        let outcome: Result<()> = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt).map(drop));

        let flushed: Result<()> = self.output.flush().map_err(LoxError::from);

        match outcome.and(flushed) {
            Ok(()) => info!("Interpretation completed successfully"),
            Err(e) => diagnostics.report(e),
        }
    }

    // ───────────────────────────── statements ──────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: Env = Environment::child_of(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                debug!("Entering while loop");
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }
                debug!("Exited while loop");
                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` inside `env`, restoring the current scope afterwards
    /// whether or not they succeed.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Result<Flow> {
        let previous: Env = mem::replace(&mut self.environment, env);

        let mut result: Result<Flow> = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Flow> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra scope holding `super`.
        let method_env: Env = match &superclass {
            Some(class) => {
                let env = Environment::child_of(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|decl| {
                let is_init: bool = decl.name.lexeme == "init";
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env), is_init);
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);
        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(Flow::Normal)
    }

    // ───────────────────────────── expressions ─────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Int(n) => Value::Int(*n),
                LiteralValue::Float(n) => Value::Float(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;
                evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        let found: bool = self.environment.borrow_mut().assign_at(
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                        if !found {
                            return Err(undefined_variable(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                match callee.as_callable() {
                    Some(callable) => callable.call(self, values, paren),
                    None => Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    )),
                }
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                Value::Array(array) => LoxArray::get(&array, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => self
                .environment
                .borrow()
                .get_at(distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super` sits `distance` scopes out; `this` is always one scope nearer.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| undefined_variable(keyword))?;

        let env = self.environment.borrow();

        let superclass: Rc<LoxClass> = match env.get_at(distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(undefined_variable(keyword)),
        };

        let object: Rc<LoxInstance> = match distance
            .checked_sub(1)
            .and_then(|d| env.get_at(d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(LoxError::runtime(keyword, "Undefined variable 'this'.")),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

// ───────────────────────────── operators ───────────────────────────────────

fn evaluate_unary(operator: &Token, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

        TokenType::MINUS => match right {
            Value::Int(n) => Ok(n
                .checked_neg()
                .map_or(Value::Float(-(n as f64)), Value::Int)),
            Value::Float(n) => Ok(Value::Float(-n)),
            _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
        },

        _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        TokenType::PLUS => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ if left.is_number() && right.is_number() => {
                Ok(arithmetic(operator.token_type, &left, &right))
            }
            _ => Err(LoxError::runtime(
                operator,
                "Operands must either be both numbers or both strings.",
            )),
        },

        TokenType::GREATER
        | TokenType::GREATER_EQUAL
        | TokenType::LESS
        | TokenType::LESS_EQUAL => {
            check_numbers(operator, &left, &right)?;

            let ordering: Option<Ordering> = match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
                _ => left
                    .as_f64()
                    .zip(right.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
            };

            let result: bool = match (operator.token_type, ordering) {
                (_, None) => false, // NaN compares false every way
                (TokenType::GREATER, Some(o)) => o == Ordering::Greater,
                (TokenType::GREATER_EQUAL, Some(o)) => o != Ordering::Less,
                (TokenType::LESS, Some(o)) => o == Ordering::Less,
                (_, Some(o)) => o != Ordering::Greater,
            };

            Ok(Value::Bool(result))
        }

        TokenType::MINUS
        | TokenType::STAR
        | TokenType::SLASH
        | TokenType::PERCENT
        | TokenType::BACK_SLASH
        | TokenType::CARAT => {
            check_numbers(operator, &left, &right)?;
            Ok(arithmetic(operator.token_type, &left, &right))
        }

        _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
    }
}

fn check_numbers(operator: &Token, left: &Value, right: &Value) -> Result<()> {
    if left.is_number() && right.is_number() {
        Ok(())
    } else {
        Err(LoxError::runtime(operator, "Operands must be numbers."))
    }
}

/// Both operands are numbers.  Two integers stay integral unless the
/// operation overflows or is `/`.
fn arithmetic(op: TokenType, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        _ => float_arithmetic(
            op,
            left.as_f64().unwrap_or(f64::NAN),
            right.as_f64().unwrap_or(f64::NAN),
        ),
    }
}

fn int_arithmetic(op: TokenType, a: i64, b: i64) -> Value {
    let exact: Option<i64> = match op {
        TokenType::PLUS => a.checked_add(b),
        TokenType::MINUS => a.checked_sub(b),
        TokenType::STAR => a.checked_mul(b),
        TokenType::PERCENT if b == 0 => return Value::Float(f64::NAN),
        TokenType::PERCENT => a.checked_rem(b),
        TokenType::BACK_SLASH if b == 0 => return Value::Float(f64::NAN),
        TokenType::BACK_SLASH => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        TokenType::CARAT => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    };

    exact.map_or_else(|| float_arithmetic(op, a as f64, b as f64), Value::Int)
}

fn float_arithmetic(op: TokenType, a: f64, b: f64) -> Value {
    let result: f64 = match op {
        TokenType::PLUS => a + b,
        TokenType::MINUS => a - b,
        TokenType::STAR => a * b,
        TokenType::SLASH | TokenType::PERCENT | TokenType::BACK_SLASH if b == 0.0 => f64::NAN,
        TokenType::SLASH => a / b,
        TokenType::PERCENT => a % b,
        TokenType::BACK_SLASH => (a / b).floor(),
        TokenType::CARAT => a.powf(b),
        _ => f64::NAN,
    };

    Value::Float(result)
}
