//! A Lox session: runs source through every phase against one long-lived
//! interpreter, so globals defined by one `run` are visible to the next.
//!
//! ```text
//! source ─► Scanner ─► Parser ─► Resolver ─► Interpreter
//! ```
//!
//! A phase only runs when every phase before it finished without errors.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use memmap2::Mmap;

use crate::error::{Diagnostics, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::preprocessor::{Preprocessor, Resolved};
use crate::resolver::Resolver;
use crate::scanner::Scanner;

pub struct Lox {
    interpreter: Interpreter,
    include_dir: Option<PathBuf>,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
            include_dir: None,
        }
    }

    /// A session whose `print` output goes to `output` instead of stdout.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
            include_dir: None,
        }
    }

    /// Directory searched for `include <name>` before the bundled libraries.
    pub fn set_include_dir(&mut self, dir: impl Into<PathBuf>) {
        self.include_dir = Some(dir.into());
    }

    /// Run one chunk of source and return everything it reported.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);

        if diagnostics.had_error() {
            info!("Skipping resolution: {} front-end errors", diagnostics.len());
            return diagnostics;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut diagnostics);

        if diagnostics.had_error() {
            info!("Skipping execution: resolver reported an error");
            return diagnostics;
        }

        self.interpreter.interpret(&statements, &mut diagnostics);

        diagnostics
    }

    /// Expand leading `include` directives (relative to the file's own
    /// directory), run the result, and report positions in the file's own
    /// line numbering.
    pub fn run_file(&mut self, path: &Path) -> Result<Diagnostics> {
        let source: String = read_source(path)?;
        let base_dir: &Path = path.parent().unwrap_or_else(|| Path::new(""));

        let mut preprocessor = Preprocessor::new(base_dir);
        if let Some(dir) = &self.include_dir {
            preprocessor = preprocessor.with_include_dir(dir);
        }

        let Resolved {
            source,
            line_delta,
            origins,
        } = preprocessor.resolve(&source)?;
        debug!("Running {:?} with line delta {}", path, line_delta);

        let mut diagnostics = self.run(&source);
        diagnostics.remap_lines(&origins);

        Ok(diagnostics)
    }
}

/// Read a whole source file as UTF-8 through a memory map.
pub fn read_source(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);

    let file = File::open(path)?;

    // Mapping an empty file fails on some platforms.
    if file.metadata()?.len() == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is copied into an owned String before it is dropped,
    // and a source file is not expected to change while it is being read.
    let map = unsafe { Mmap::map(&file)? };
    let source = String::from_utf8(map.to_vec())?;

    info!("Read {} bytes from {:?}", source.len(), path);

    Ok(source)
}
