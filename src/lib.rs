pub mod array;
pub mod ast;
pub mod ast_printer;
pub mod builtins;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod preprocessor;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

pub use crate::error::{Diagnostics, LoxError, Result};
pub use crate::lox::Lox;
