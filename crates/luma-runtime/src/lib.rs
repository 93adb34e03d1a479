//! LumaLab runtime: runs sketches against a device under an execution
//! scheduler.
//!
//! ```text
//! sketch ─ validate ─ transpile ─ ProgramCache ─ Sketch::instantiate ─ setup ─ loop…
//! ```
//!
//! [`Scheduler`] owns the session lifecycle and the generation token that
//! cancels it. [`LedStrip`] is the in-memory device; [`MemoryConsole`] and
//! [`StdoutConsole`] are the console sinks.

pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod scheduler;

pub use config::{ConfigError, RunConfig};
pub use console::{ConsoleLine, MemoryConsole, StdoutConsole};
pub use device::{LedStrip, StripStats};
pub use error::RunError;
pub use scheduler::{RunHandle, RunOutcome, RunState, Scheduler, SchedulerSnapshot, SKETCH_FILE};
