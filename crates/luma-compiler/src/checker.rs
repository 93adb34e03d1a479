//! Entry-point checker: validates the shape the scheduler relies on.
//!
//! Error codes emitted:
//! - E600: `setup` or `loop` missing
//! - E601: entry point not `async`
//! - E602: entry point declares parameters
//! - E503 (warning): top-level function declared more than once

use std::collections::HashMap;
use std::sync::Arc;

use luma_types::ast::{FunctionDecl, Program};
use luma_types::{CompileErrors, ErrorCode, LumaError, SourceFile};

/// Names of the two functions every program must export.
pub const SETUP: &str = "setup";
pub const LOOP: &str = "loop";

/// The validated entry points of a program.
#[derive(Debug, Clone)]
pub struct EntryPoints {
    pub setup: Arc<FunctionDecl>,
    pub loop_fn: Arc<FunctionDecl>,
}

pub struct EntryPointChecker<'a> {
    errors: &'a mut CompileErrors,
    source: &'a SourceFile,
}

impl<'a> EntryPointChecker<'a> {
    pub fn new(errors: &'a mut CompileErrors, source: &'a SourceFile) -> Self {
        Self { errors, source }
    }

    /// Check a complete program. Returns the entry points if both are valid.
    pub fn check(&mut self, program: &Program) -> Option<EntryPoints> {
        self.check_duplicates(program);
        let setup = self.check_entry(program, SETUP);
        let loop_fn = self.check_entry(program, LOOP);
        Some(EntryPoints {
            setup: setup?,
            loop_fn: loop_fn?,
        })
    }

    fn check_entry(&mut self, program: &Program, name: &str) -> Option<Arc<FunctionDecl>> {
        let Some(func) = program.function(name) else {
            let span = program.span;
            self.errors.push_error(
                LumaError::at(
                    self.source,
                    ErrorCode::MISSING_ENTRY_POINT,
                    format!("program must define '{name}'"),
                    span,
                )
                .with_suggestion(format!("add: async function {name}() {{ ... }}")),
            );
            return None;
        };

        let mut ok = true;
        if !func.is_async {
            self.errors.push_error(
                LumaError::at(
                    self.source,
                    ErrorCode::ENTRY_POINT_NOT_ASYNC,
                    format!("'{name}' must be an async function"),
                    func.name.span,
                )
                .with_suggestion(format!("declare it as: async function {name}()")),
            );
            ok = false;
        }
        if let Some(first) = func.params.first() {
            self.errors.push_error(LumaError::at(
                self.source,
                ErrorCode::ENTRY_POINT_HAS_PARAMS,
                format!(
                    "'{name}' must take no parameters, found {}",
                    func.params.len()
                ),
                first.span,
            ));
            ok = false;
        }
        ok.then(|| Arc::clone(func))
    }

    fn check_duplicates(&mut self, program: &Program) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for func in program.functions() {
            let count = seen.entry(func.name.name.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                self.errors.push_warning(
                    LumaError::at(
                        self.source,
                        ErrorCode::DUPLICATE_FUNCTION,
                        format!(
                            "function '{}' is declared more than once; the last declaration wins",
                            func.name.name
                        ),
                        func.name.span,
                    )
                    .as_warning(),
                );
            }
        }
    }
}
