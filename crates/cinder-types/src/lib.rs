//! Shared types for the Cinder toolchain.
//!
//! This crate defines the AST node types, source spans, diagnostics,
//! and other shared data structures used by the lexer, parser and the
//! interactive evaluation core.

mod error;
mod span;
pub mod ast;

pub use error::{CinderError, CompileErrors, ErrorCategory, ErrorCode, Severity, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used throughout the Cinder front end.
pub type Result<T> = std::result::Result<T, CinderError>;
