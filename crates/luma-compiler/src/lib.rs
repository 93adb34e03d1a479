//! LumaLab compiler: turns transformed host script into a [`CompiledProgram`].
//!
//! ```text
//! Host script → Lexer → Parser (scope checks) → Entry-point checker → CompiledProgram
//! ```
//!
//! [`ProgramCache`] memoises the whole pipeline per distinct source.

pub mod cache;
pub mod checker;
mod program;

pub use cache::{CacheStats, ProgramCache};
pub use checker::{EntryPointChecker, EntryPoints, LOOP, SETUP};
pub use program::CompiledProgram;

use luma_lexer::Lexer;
use luma_parser::Parser;
use luma_types::ast::Program;
use luma_types::{CompileErrors, SourceFile};
use sha2::{Digest, Sha256};

/// Compile transformed source into a program exposing `setup` and `loop`.
pub fn compile(transformed: &str, file_name: &str) -> Result<CompiledProgram, CompileErrors> {
    let source = SourceFile::new(file_name, transformed);
    let (program, entry, mut errors) = run_pipeline(&source);

    match (program, entry) {
        (Some(program), Some(entry)) if !errors.has_errors() => {
            let digest = source_digest(transformed);
            tracing::debug!(%digest, file = file_name, "compiled program");
            let warnings = std::mem::take(&mut errors.warnings);
            Ok(CompiledProgram::new(program, entry, digest, warnings))
        }
        _ => Err(errors),
    }
}

/// Run the front end and report every diagnostic, errors and warnings.
pub fn check(transformed: &str, file_name: &str) -> CompileErrors {
    let source = SourceFile::new(file_name, transformed);
    run_pipeline(&source).2
}

fn run_pipeline(source: &SourceFile) -> (Option<Program>, Option<EntryPoints>, CompileErrors) {
    let lexed = Lexer::new(source).lex();
    if lexed.errors.has_errors() {
        return (None, None, lexed.errors);
    }
    let mut errors = lexed.errors;

    let parsed = Parser::new(lexed.tokens, source).parse();
    errors.extend(parsed.errors);
    if errors.has_errors() {
        return (None, None, errors);
    }

    let entry = EntryPointChecker::new(&mut errors, source).check(&parsed.program);
    (Some(parsed.program), entry, errors)
}

/// SHA-256 of `source` as lowercase hex.
pub fn source_digest(source: &str) -> String {
    Sha256::digest(source.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
