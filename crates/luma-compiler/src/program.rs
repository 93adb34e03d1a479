use std::sync::Arc;

use luma_types::ast::{FunctionDecl, Program};
use luma_types::LumaError;

use crate::checker::EntryPoints;

/// A checked host script, ready to be instantiated against a device.
///
/// Cheap to share: the scheduler holds it behind an `Arc` from the cache.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    program: Program,
    entry: EntryPoints,
    digest: String,
    warnings: Vec<LumaError>,
}

impl CompiledProgram {
    pub(crate) fn new(
        program: Program,
        entry: EntryPoints,
        digest: String,
        warnings: Vec<LumaError>,
    ) -> Self {
        Self {
            program,
            entry,
            digest,
            warnings,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn setup(&self) -> &Arc<FunctionDecl> {
        &self.entry.setup
    }

    pub fn loop_fn(&self) -> &Arc<FunctionDecl> {
        &self.entry.loop_fn
    }

    /// SHA-256 hex digest of the transformed source.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Non-fatal diagnostics from compilation.
    pub fn warnings(&self) -> &[LumaError] {
        &self.warnings
    }
}
