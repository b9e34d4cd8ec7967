//! Syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Nodes own their tokens so a tree can outlive the scanner's buffer; this
//! matters for the REPL, where functions declared by one line are called from
//! later lines.  Function bodies sit behind an `Rc` so that every runtime
//! closure created from a declaration shares the same tree.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of a variable-referencing expression.
///
/// The resolver keys its hop-count table on this id rather than on the
/// structure of the expression, so two textually identical `a` reads in
/// different scopes resolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    /// Allocate an id that is unique for the lifetime of the process.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A constant written directly in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub-expression.
    Grouping(Box<Expr>),

    /// Prefix `!` or `-`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)`, kept for error positions.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

/// A named function or method: parameters plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop, also the target of the `for` desugaring.  `increment`
    /// runs after every iteration of the body, including one cut short by
    /// `continue`.
    While {
        condition: Expr,
        body: Box<Stmt>,
        increment: Option<Expr>,
    },

    Break(Token),

    Continue(Token),

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword, for error positions.
        keyword: Token,
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an [`Expr::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
