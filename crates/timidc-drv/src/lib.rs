//! timidc-drv - Compiler driver.
//!
//! Orchestrates the pipeline for each input file:
//!
//! ```text
//! read file -> lex -> parse -> [gate] -> compile -> [gate] -> write .timb
//! ```
//!
//! Both gates check the handler's sticky `had_error` flag: later phases may
//! still run to surface extra diagnostics, but no output file is written
//! once anything went wrong.
//!
//! Exit codes follow the sysexits convention the original toolchain used:
//! `0` success, `64` usage problems / empty input (also `--help` and
//! `--version`), `65` unreadable input, `1` failed compilation.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use timidc_gen::{debug, writer, Compiler};
use timidc_lex::Lexer;
use timidc_par::Parser;
use timidc_util::Handler;

/// Usage text for `-h` and bad invocations.
pub const USAGE: &str = "\
Usage: timidc [options] <file.timid>...

Options:
  -c, --compile    produce a bytecode file; do not run
  -d, --dev        verbose compiler tracing to stdout
  -h, --help       print this help and exit
  -v, --version    print the version and exit
";

/// Driver configuration parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Stop after emitting bytecode (currently the only pipeline; the VM
    /// that would run the output is a separate program).
    pub compile_only: bool,

    /// Verbose tracing: phase progress, disassembly, and a hex dump.
    pub dev: bool,

    /// Input source files.
    pub files: Vec<PathBuf>,
}

/// What a command-line invocation asked for.
#[derive(Debug, Clone)]
pub enum CliRequest {
    Run(Config),
    Help,
    Version,
}

/// Driver failures, each mapped to a process exit code.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no input files")]
    NoInput,

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("empty input file '{}'", path.display())]
    EmptyInput { path: PathBuf },

    #[error("cannot read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Unwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("compilation failed")]
    CompilationFailed,
}

impl DriverError {
    /// The process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::NoInput | DriverError::UnknownOption(_) | DriverError::EmptyInput { .. } => 64,
            DriverError::Unreadable { .. } | DriverError::Unwritable { .. } => 65,
            DriverError::CompilationFailed => 1,
        }
    }
}

/// Parses command-line arguments (without the program name).
pub fn parse_args<I>(args: I) -> Result<CliRequest, DriverError>
where
    I: IntoIterator<Item = String>,
{
    let mut config = Config::default();

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliRequest::Help),
            "-v" | "--version" => return Ok(CliRequest::Version),
            "-c" | "--compile" => config.compile_only = true,
            "-d" | "--dev" => config.dev = true,
            other if other.starts_with('-') => {
                return Err(DriverError::UnknownOption(other.to_string()));
            },
            _ => config.files.push(PathBuf::from(arg)),
        }
    }

    if config.files.is_empty() {
        return Err(DriverError::NoInput);
    }
    Ok(CliRequest::Run(config))
}

/// One compiler invocation: configuration plus the shared diagnostic sink.
pub struct Session {
    pub config: Config,
    pub handler: Handler,
}

impl Session {
    /// Creates a session for the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: Handler::new(),
        }
    }

    /// Compiles every input file, stopping at the first failure.
    pub fn run(&self) -> Result<(), DriverError> {
        for path in &self.config.files {
            self.compile_file(path)?;
        }
        Ok(())
    }

    /// Runs the pipeline over one source file.
    ///
    /// On success the bytecode lands next to the source as `<stem>.timb`.
    pub fn compile_file(&self, path: &Path) -> Result<(), DriverError> {
        // Diagnostics are scoped to a single compilation
        self.handler.clear();

        let source = fs::read_to_string(path).map_err(|source| DriverError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if source.is_empty() {
            return Err(DriverError::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        self.trace(&format!("lexing {}", path.display()));
        let tokens = Lexer::new(&source, &self.handler).lex();

        self.trace("parsing");
        let statements = Parser::new(tokens, &self.handler).parse();

        if self.handler.has_errors() {
            eprint!("{}", self.handler.render(&source));
            return Err(DriverError::CompilationFailed);
        }

        self.trace("compiling");
        let chunk = Compiler::new(&self.handler).compile(&statements);

        let chunk = match chunk {
            Some(chunk) => chunk,
            None => {
                eprint!("{}", self.handler.render(&source));
                return Err(DriverError::CompilationFailed);
            },
        };

        let output = path.with_extension("timb");
        writer::write(&chunk, &output).map_err(|source| DriverError::Unwritable {
            path: output.clone(),
            source,
        })?;

        if self.config.dev {
            let name = path.display().to_string();
            print!("{}", debug::disassemble(&chunk, &name));
            print!("{}", debug::hex_dump(&writer::to_bytes(&chunk)));
        }
        self.trace(&format!("wrote {}", output.display()));

        Ok(())
    }

    fn trace(&self, message: &str) {
        if self.config.dev {
            println!("[timidc] {}", message);
        }
    }
}

/// Entry point shared by the binary; returns the process exit code.
pub fn main_with_args<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    match parse_args(args) {
        Ok(CliRequest::Help) => {
            print!("{}", USAGE);
            64
        },
        Ok(CliRequest::Version) => {
            println!("timidc {}", env!("CARGO_PKG_VERSION"));
            64
        },
        Ok(CliRequest::Run(config)) => {
            let session = Session::new(config);
            match session.run() {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {}", error);
                    error.exit_code()
                },
            }
        },
        Err(error) => {
            eprintln!("error: {}", error);
            eprint!("{}", USAGE);
            error.exit_code()
        },
    }
}
