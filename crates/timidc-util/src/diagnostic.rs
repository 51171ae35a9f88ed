//! Diagnostic module - Error reporting infrastructure.
//!
//! Every phase of the pipeline reports problems through a shared [`Handler`].
//! The handler collects [`Diagnostic`] records and keeps two sticky flags:
//! `had_error` (lexing/parsing/compiling problems - suppresses all output)
//! and `had_runtime_error` (reserved for the tree-interpreter collaborator).
//!
//! Rendering a diagnostic produces a two-line header followed by the
//! offending source lines with a caret underline:
//!
//! ```text
//! Syntax Error @ (3, 9):
//!     Expected a closing ')' for grouping (after '1')
//! print (1
//!         ^
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::Span;

/// The category of a diagnostic, keyed to the phase that raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// Lexer: a character no rule accepts
    InvalidCharacter,
    /// Lexer: an unterminated string literal
    MissingQuote,
    /// Parser: malformed syntax
    Syntax,
    /// Compiler: bad variable declaration or lookup
    Resolution,
    /// Compiler: emission limits (jump distance, loop size, ...)
    Compile,
    /// Tree-interpreter collaborator: evaluation failure
    Runtime,
    /// Tree-interpreter collaborator: failed `|-` assertion
    Assertion,
}

impl ReportKind {
    /// Returns true for the kinds that flip `had_runtime_error` rather
    /// than `had_error`.
    pub fn is_runtime(self) -> bool {
        matches!(self, ReportKind::Runtime | ReportKind::Assertion)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::InvalidCharacter => write!(f, "Invalid Character"),
            ReportKind::MissingQuote => write!(f, "Missing Quote"),
            ReportKind::Syntax => write!(f, "Syntax"),
            ReportKind::Resolution => write!(f, "Resolution"),
            ReportKind::Compile => write!(f, "Compile"),
            ReportKind::Runtime => write!(f, "Runtime"),
            ReportKind::Assertion => write!(f, "Assertion"),
        }
    }
}

/// A single reported problem.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Which phase raised it
    pub kind: ReportKind,
    /// Human-readable message
    pub message: String,
    /// The source range the message refers to
    pub span: Span,
}

/// Collector for diagnostics with the sticky error flags.
///
/// The handler is interior-mutable so that a single instance can be shared
/// by reference across the lexer, parser, and compiler of one compilation.
///
/// # Examples
///
/// ```
/// use timidc_util::{Handler, Span};
///
/// let handler = Handler::new();
/// handler.syntax_error(Span::DUMMY, "Expected an expression");
///
/// assert!(handler.has_errors());
/// assert_eq!(handler.error_count(), 1);
/// ```
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Handler {
    /// Create a new handler with clear flags.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            had_error: Cell::new(false),
            had_runtime_error: Cell::new(false),
        }
    }

    /// Record a diagnostic and flip the matching sticky flag.
    pub fn report(&self, kind: ReportKind, span: Span, message: impl Into<String>) {
        if kind.is_runtime() {
            self.had_runtime_error.set(true);
        } else {
            self.had_error.set(true);
        }
        self.diagnostics.borrow_mut().push(Diagnostic {
            kind,
            message: message.into(),
            span,
        });
    }

    /// Lexer: report a character no rule accepts.
    pub fn invalid_character(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::InvalidCharacter, span, message);
    }

    /// Lexer: report an unterminated string literal.
    pub fn missing_quote(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::MissingQuote, span, message);
    }

    /// Parser: report malformed syntax.
    pub fn syntax_error(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::Syntax, span, message);
    }

    /// Compiler: report a variable declaration or lookup problem.
    pub fn resolve_error(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::Resolution, span, message);
    }

    /// Compiler: report an emission limit violation.
    pub fn compile_error(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::Compile, span, message);
    }

    /// Tree-interpreter collaborator: report an evaluation failure.
    pub fn runtime_error(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::Runtime, span, message);
    }

    /// Tree-interpreter collaborator: report a failed assertion.
    pub fn assertion_error(&self, span: Span, message: impl Into<String>) {
        self.report(ReportKind::Assertion, span, message);
    }

    /// True once any non-runtime diagnostic has been reported.
    pub fn has_errors(&self) -> bool {
        self.had_error.get()
    }

    /// True once any runtime or assertion diagnostic has been reported.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Number of recorded diagnostics of every kind.
    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Snapshot of all recorded diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Reset the handler for a fresh compilation.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }

    /// Render every recorded diagnostic against the source it refers to.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for diagnostic in self.diagnostics.borrow().iter() {
            out.push_str(&render_diagnostic(diagnostic, source));
        }
        out
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one diagnostic: header, message, caret-underlined excerpt.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str) -> String {
    let span = diagnostic.span;
    let mut out = String::new();
    out.push_str(&format!(
        "{} Error @ ({}, {}):\n",
        diagnostic.kind, span.line, span.column
    ));
    out.push_str(&format!("\t{}\n", diagnostic.message));
    out.push_str(&underline(source, span));
    out
}

/// Produce the offending source lines with a `^` underline per line.
///
/// The underline spans `[col_start, col_end)` on each involved line; the
/// first line starts at the span's column and the last line stops at the
/// span end. A zero-width span still gets a single caret. Tabs are
/// replaced by spaces so the carets line up.
pub fn underline(source: &str, span: Span) -> String {
    let start = span.start.min(source.len());
    let end = span.end.min(source.len()).max(start);

    let mut out = String::new();
    let mut line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);

    loop {
        let line_end = source[line_start..]
            .find('\n')
            .map_or(source.len(), |i| line_start + i);
        let line = &source[line_start..line_end];

        let col_start = if start > line_start {
            source[line_start..start].chars().count()
        } else {
            0
        };
        let col_end = if end <= line_end {
            source[line_start..end].chars().count()
        } else {
            line.chars().count()
        };
        let carets = (col_end.saturating_sub(col_start)).max(1);

        out.push_str(&line.replace('\t', " "));
        out.push('\n');
        out.push_str(&" ".repeat(col_start));
        out.push_str(&"^".repeat(carets));
        out.push('\n');

        if end <= line_end || line_end == source.len() {
            break;
        }
        line_start = line_end + 1;
    }

    out
}
