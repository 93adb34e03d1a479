use std::sync::Arc;

use luma_compiler::CompiledProgram;

use crate::error::EvalResult;
use crate::evaluator::Interpreter;
use crate::host::HostContext;
use crate::value::Value;

/// A compiled program bound to one session's host.
pub struct Sketch {
    interpreter: Interpreter,
    program: Arc<CompiledProgram>,
}

impl Sketch {
    /// Bind `program` to `host` and run its top-level statements once.
    pub async fn instantiate(program: Arc<CompiledProgram>, host: HostContext) -> EvalResult<Self> {
        let mut interpreter = Interpreter::new(host);
        interpreter.run_program(program.program()).await?;
        tracing::debug!(digest = program.digest(), "sketch instantiated");
        Ok(Self {
            interpreter,
            program,
        })
    }

    pub async fn setup(&mut self) -> EvalResult<()> {
        let setup = Arc::clone(self.program.setup());
        self.interpreter.call_function(setup, Vec::new()).await.map(drop)
    }

    /// One invocation of `loop`.
    pub async fn run_loop(&mut self) -> EvalResult<()> {
        let loop_fn = Arc::clone(self.program.loop_fn());
        self.interpreter.call_function(loop_fn, Vec::new()).await.map(drop)
    }

    pub fn program(&self) -> &Arc<CompiledProgram> {
        &self.program
    }

    pub fn host(&self) -> &HostContext {
        self.interpreter.host()
    }

    /// Current value of a global binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interpreter.global(name).cloned()
    }
}
