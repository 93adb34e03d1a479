//! LumaLab parser: converts a token stream into a host script AST.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser, MAX_EXPR_DEPTH, MAX_NESTING_DEPTH};
