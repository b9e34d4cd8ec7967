//! Scope resolution, run after parsing and before execution.
//!
//! One walk over the tree does three jobs:
//! 1. Build lexical scopes (stack of `HashMap<&str, bool>` tracking declared/defined).
//! 2. Report static errors: redeclaration, reading a local in its own
//!    initializer, and `return`/`this`/`super`/`break`/`continue` used where
//!    they mean nothing.
//! 3. Tell the interpreter, for each local variable occurrence, how many
//!    scopes out its binding lives.  Occurrences that are not recorded are
//!    globals.
//!
//! The walk stops at the first error.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Diagnostics, LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Used to validate `break` and `continue`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LoopType {
    None,
    Loop,
}

/// Walks a parsed program and hands each local's hop count to the
/// interpreter it borrows.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    current_loop: LoopType,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver created");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            current_loop: LoopType::None,
        }
    }

    /// Walk all top-level statements, reporting the first error (if any).
    pub fn resolve(&mut self, statements: &'a [Stmt], diagnostics: &mut Diagnostics) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        if let Err(e) = self.resolve_stmts(statements) {
            diagnostics.report(e);
        }
    }

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body, for recursion
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods)?,

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                let enclosing = self.current_loop;
                self.current_loop = LoopType::Loop;

                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
                if let Some(inc) = increment {
                    self.resolve_expr(inc)?;
                }

                self.current_loop = enclosing;
            }

            Stmt::Break(keyword) => self.check_in_loop(keyword)?,

            Stmt::Continue(keyword) => self.check_in_loop(keyword)?,

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolve(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn check_in_loop(&self, keyword: &Token) -> Result<()> {
        if self.current_loop == LoopType::None {
            return Err(LoxError::resolve(
                keyword,
                format!("Can't use '{}' outside of a for or while loop.", keyword.lexeme),
            ));
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &'a Token,
        superclass: Option<&'a Expr>,
        methods: &'a [Rc<FunctionDecl>],
    ) -> Result<()> {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name)?;
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == name.lexeme {
                    return Err(LoxError::resolve(
                        super_name,
                        "Class cannot inherit from itself.",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.bind_implicit("super");
        }

        self.begin_scope();
        self.bind_implicit("this");

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, kind)?;
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(LoxError::resolve(
                            name,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword,
                        "Can't use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        return Err(LoxError::resolve(
                            keyword,
                            "Can't use 'super' outside of a class.",
                        ));
                    }
                    ClassType::Class => {
                        return Err(LoxError::resolve(
                            keyword,
                            "Can't use 'super' in a class with no superclass.",
                        ));
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.  Loops outside
    /// the function do not make `break` legal inside it.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) -> Result<()> {
        debug!("Resolving function '{}' as {:?}", decl.name.lexeme, kind);

        let enclosing_function = self.current_function;
        let enclosing_loop = self.current_loop;
        self.current_function = kind;
        self.current_loop = LoopType::None;

        self.begin_scope();
        let result = self.resolve_params_and_body(decl);
        self.end_scope();

        self.current_function = enclosing_function;
        self.current_loop = enclosing_loop;

        result
    }

    fn resolve_params_and_body(&mut self, decl: &'a FunctionDecl) -> Result<()> {
        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }

        self.resolve_stmts(&decl.body)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Define a name the program never declares itself (`this`, `super`).
    fn bind_implicit(&mut self, name: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    /// At global scope this is a no-op: globals may be redeclared.
    fn declare(&mut self, name: &'a Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                return Err(LoxError::resolve(
                    name,
                    format!("Variable {} already declared in this scope.", name.lexeme),
                ));
            }

            scope.insert(&name.lexeme, false);
        }

        Ok(())
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(&name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record `id` as a local at depth `d` when some scope declares `name`.
    /// Otherwise leave it unrecorded, which the interpreter reads as global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
