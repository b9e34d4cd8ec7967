#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lox::ast::Stmt;
use lox::ast_printer::AstPrinter;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::{Diagnostics, Lox};

/// In-memory `print` sink that the test keeps a handle to.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8(bytes).expect("print output is UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A long-lived session whose output can be inspected between runs.
pub struct Session {
    lox: Lox,
    output: SharedBuffer,
}

impl Session {
    pub fn new() -> Self {
        let output = SharedBuffer::default();

        Self {
            lox: Lox::with_output(Box::new(output.clone())),
            output,
        }
    }

    /// Run `source`, returning what it printed and the rendered diagnostics.
    pub fn run(&mut self, source: &str) -> (String, Vec<String>) {
        let diagnostics = self.lox.run(source);

        (self.output.take(), diagnostics.messages())
    }

    pub fn run_diagnostics(&mut self, source: &str) -> Diagnostics {
        self.lox.run(source)
    }

    pub fn run_file(&mut self, path: &Path) -> lox::Result<(String, Vec<String>)> {
        let diagnostics = self.lox.run_file(path)?;

        Ok((self.output.take(), diagnostics.messages()))
    }

    pub fn lox(&mut self) -> &mut Lox {
        &mut self.lox
    }
}

/// A fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lox-it-{}-{}", std::process::id(), tag));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Run a program in a fresh session.
pub fn run(source: &str) -> (String, Vec<String>) {
    Session::new().run(source)
}

/// Run a program that must not report anything, returning its output.
pub fn output_of(source: &str) -> String {
    let (output, errors) = run(source);
    assert!(errors.is_empty(), "unexpected diagnostics: {:?}", errors);
    output
}

/// Run a program and return only its diagnostics.
pub fn errors_of(source: &str) -> Vec<String> {
    run(source).1
}

/// Scan and parse, returning statements and diagnostics.
pub fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);

    (statements, diagnostics.messages())
}

/// Parse and print every statement in prefix form.
pub fn sexprs(source: &str) -> Vec<String> {
    let (statements, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected diagnostics: {:?}", errors);

    statements.iter().map(AstPrinter::print_stmt).collect()
}
