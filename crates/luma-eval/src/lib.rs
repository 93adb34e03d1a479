//! LumaLab evaluator: runs a [`CompiledProgram`](luma_compiler::CompiledProgram)
//! against a [`Device`] and a [`Console`].
//!
//! Evaluation is asynchronous so `await delay(ms)` can suspend without
//! blocking the executor. Every suspension point and every device-touching
//! builtin checks the session's [`RunToken`] first; a stale token unwinds
//! with [`EvalError::Stopped`].

mod builtins;
pub mod cancel;
mod env;
pub mod error;
mod evaluator;
pub mod host;
mod sketch;
pub mod value;

pub use builtins::Builtin;
pub use cancel::{suspend, Generation, RunToken, SuspendConfig, ZeroDelayPolicy};
pub use error::{EvalError, EvalResult};
pub use evaluator::MAX_CALL_DEPTH;
pub use host::{Console, Device, DeviceError, HostContext, LogLevel, PinMode};
pub use sketch::Sketch;
pub use value::Value;
