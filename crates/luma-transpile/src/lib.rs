//! LumaLab transpiler: rewrites the sketch dialect into host script.
//!
//! ```text
//! void setup() { int n = 3; delay(n); }
//!   ↓
//! async function setup() { let n = 3; await delay(n); }
//! ```
//!
//! A single pass drives the [`Scanner`] (comment/string/template regions)
//! and the [`ContextTracker`] (brace depth, function nesting) so rewrites
//! never happen inside comments, literals, or non-suspendable bodies.

pub mod scanner;
pub mod tracker;
pub mod transpiler;
mod validate;

pub use scanner::{classify, Quote, ScanEvent, ScanState, Scanner, Step};
pub use tracker::{ContextTracker, FunctionContext};
pub use transpiler::{transpile, ENTRY_POINTS, PRIMITIVE_TYPES};
pub use validate::{validate_sketch, SketchError};
