//! Shared types for the LumaLab sketch engine.
//!
//! This crate defines the host-script AST, source spans, and the structured
//! diagnostics produced by the lexer, parser, and compiler stages.

mod error;
mod span;
pub mod ast;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, LumaError, Severity, MAX_ERRORS};
pub use span::{SourceFile, Span};
