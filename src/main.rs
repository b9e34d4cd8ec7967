use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use lox::ast_printer::AstPrinter;
use lox::error::{Diagnostics, LoxError};
use lox::lox::{read_source, Lox};
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;

/// Exit status for scan, parse, resolve and include errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to lox.log
    #[arg(long, global = true)]
    log: bool,

    /// Directory searched for `include <name>` libraries
    #[arg(long, global = true, value_name = "DIR")]
    include_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints its syntax tree
    Parse { filename: PathBuf },

    /// Runs a file as a Lox program
    Run {
        filename: PathBuf,

        /// Do not expand leading `include` directives
        #[arg(long)]
        no_preprocess: bool,
    },

    /// Starts an interactive prompt (the default)
    Repl,
}

fn init_logger() -> Result<()> {
    let log_file = File::create("lox.log").context("Failed to create lox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("lox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to lox.log");
    Ok(())
}

fn report(diagnostics: &Diagnostics) {
    for error in diagnostics.iter() {
        eprintln!("{}", error);
    }
}

fn exit_code(diagnostics: &Diagnostics) -> Option<i32> {
    if diagnostics.had_error() {
        Some(EXIT_STATIC_ERROR)
    } else if diagnostics.had_runtime_error() {
        Some(EXIT_RUNTIME_ERROR)
    } else {
        None
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<Option<i32>> {
    let source = read_source(filename).with_context(|| format!("Failed to read {:?}", filename))?;
    let mut diagnostics = Diagnostics::new();
    let tokens: Vec<Token> = Scanner::new(&source).scan_tokens(&mut diagnostics);

    report(&diagnostics);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    Ok(exit_code(&diagnostics))
}

fn parse(filename: &Path) -> Result<Option<i32>> {
    let source = read_source(filename).with_context(|| format!("Failed to read {:?}", filename))?;
    let mut diagnostics = Diagnostics::new();
    let tokens: Vec<Token> = Scanner::new(&source).scan_tokens(&mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    report(&diagnostics);

    Ok(exit_code(&diagnostics))
}

fn run(lox: &mut Lox, filename: &Path, no_preprocess: bool) -> Result<Option<i32>> {
    let diagnostics = if no_preprocess {
        let source =
            read_source(filename).with_context(|| format!("Failed to read {:?}", filename))?;
        lox.run(&source)
    } else {
        match lox.run_file(filename) {
            Ok(diagnostics) => diagnostics,
            Err(e @ LoxError::Include { .. }) => {
                eprintln!("{}", e);
                return Ok(Some(EXIT_STATIC_ERROR));
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to run {:?}", filename)),
        }
    };

    report(&diagnostics);

    Ok(exit_code(&diagnostics))
}

/// Read-eval-print loop.  State persists between lines; errors never end it.
fn repl(lox: &mut Lox) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, ">>> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }

        debug!("REPL input: {:?}", line);
        report(&lox.run(&line));
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let mut lox = Lox::new();
    if let Some(dir) = &args.include_dir {
        lox.set_include_dir(dir);
    }

    let code: Option<i32> = match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => tokenize(&filename, json)?,

        Commands::Parse { filename } => parse(&filename)?,

        Commands::Run {
            filename,
            no_preprocess,
        } => run(&mut lox, &filename, no_preprocess)?,

        Commands::Repl => {
            repl(&mut lox)?;
            None
        }
    };

    if let Some(code) = code {
        debug!("Exiting with code {}", code);
        process::exit(code);
    }

    Ok(())
}
