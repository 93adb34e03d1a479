//! Terminal session errors.

use luma_eval::{DeviceError, EvalError};
use luma_transpile::SketchError;
use luma_types::CompileErrors;
use thiserror::Error;

use crate::config::ConfigError;

/// Why a session ended in the Errored state.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sketch failed the structural pre-check.
    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error("{0}")]
    Compile(CompileErrors),

    /// Invalid pin index or a write to a non-OUTPUT pin.
    #[error(transparent)]
    Pin(DeviceError),

    #[error("Runtime guard tripped after {max_runtime_ms}ms. Increase max runtime if intentional.")]
    RuntimeGuard { max_runtime_ms: u64 },

    #[error(transparent)]
    Program(EvalError),

    /// The session task ended without reporting an outcome.
    #[error("session aborted: {0}")]
    Aborted(String),
}

impl RunError {
    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Config(_) => "config",
            RunError::Sketch(_) | RunError::Compile(_) => "compile",
            RunError::Pin(_) => "pin",
            RunError::RuntimeGuard { .. } => "guard",
            RunError::Program(_) => "program",
            RunError::Aborted(_) => "aborted",
        }
    }
}

impl From<EvalError> for RunError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Device(device) => RunError::Pin(device),
            other => RunError::Program(other),
        }
    }
}
