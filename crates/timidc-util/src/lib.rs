//! timidc-util - Shared foundation types for the Timid compiler.
//!
//! This crate holds the pieces every pipeline phase needs:
//! - [`Span`] - source location tracking (byte offsets plus line/column)
//! - [`Handler`] / [`Diagnostic`] - the error reporter with its sticky flags
//!
//! The handler is owned by the driver and passed down by shared reference;
//! phases record diagnostics through it and the driver decides afterwards
//! whether any output may be produced.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, Handler, ReportKind};
pub use span::Span;

// Re-export commonly used hash containers
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
