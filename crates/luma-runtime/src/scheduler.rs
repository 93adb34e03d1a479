//! Execution scheduler: one session at a time, cancelled by generation token.
//!
//! ```text
//! Idle ──start──▶ Running ──stop──▶ Stopped
//!                    │
//!                    └──error / guard──▶ Errored
//! ```
//!
//! A session runs as a tokio task. `stop` invalidates the session's token;
//! the task observes it at its next suspension point or builtin call and
//! unwinds without reporting an error.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use luma_compiler::{compile, ProgramCache};
use luma_eval::{
    suspend, Console, Device, EvalError, Generation, HostContext, LogLevel, RunToken, Sketch,
};
use luma_transpile::{transpile, validate_sketch};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RunConfig;
use crate::error::RunError;

/// File name used in compile diagnostics.
pub const SKETCH_FILE: &str = "sketch.js";

const STOPPED_LINE: &str = "Program stopped.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Stopped,
    Errored,
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Stopped by [`Scheduler::stop`] or superseded by a newer session.
    Stopped,
    Errored(RunError),
}

impl RunOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, RunOutcome::Stopped)
    }

    pub fn error(&self) -> Option<&RunError> {
        match self {
            RunOutcome::Errored(err) => Some(err),
            RunOutcome::Stopped => None,
        }
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulerSnapshot {
    pub state: RunState,
    /// Most recently issued generation, 0 before the first start.
    pub generation: u64,
    /// Completed `loop` invocations in the current or last session.
    pub loops: u64,
    pub elapsed_ms: u64,
    /// Loops per second, over at least one second.
    pub loop_rate: f64,
}

/// Handle to a started session.
#[derive(Debug)]
pub struct RunHandle {
    generation: u64,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => RunOutcome::Errored(RunError::Aborted(err.to_string())),
        }
    }
}

struct Shared {
    state: RunState,
    /// Token value of the session that owns the fields below.
    session: u64,
    loops: u64,
    started: Option<Instant>,
    finished: Option<Instant>,
    console: Option<Arc<dyn Console>>,
}

#[derive(Clone)]
enum CacheRef {
    Global,
    Owned(Arc<ProgramCache>),
}

impl CacheRef {
    fn get(&self) -> &ProgramCache {
        match self {
            CacheRef::Global => ProgramCache::global(),
            CacheRef::Owned(cache) => cache.as_ref(),
        }
    }
}

pub struct Scheduler {
    generation: Arc<Generation>,
    shared: Arc<Mutex<Shared>>,
    cache: CacheRef,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A scheduler compiling through the process-wide program cache.
    pub fn new() -> Self {
        Self::with_cache_ref(CacheRef::Global)
    }

    pub fn with_cache(cache: Arc<ProgramCache>) -> Self {
        Self::with_cache_ref(CacheRef::Owned(cache))
    }

    fn with_cache_ref(cache: CacheRef) -> Self {
        Self {
            generation: Generation::new(),
            shared: Arc::new(Mutex::new(Shared {
                state: RunState::Idle,
                session: 0,
                loops: 0,
                started: None,
                finished: None,
                console: None,
            })),
            cache,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Start a session. Returns `None` if one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        source: &str,
        device: Arc<dyn Device>,
        console: Arc<dyn Console>,
        config: RunConfig,
    ) -> Option<RunHandle> {
        let mut shared = self.lock();
        if shared.state == RunState::Running {
            tracing::debug!("start ignored: session already running");
            return None;
        }

        let token = self.generation.issue();
        let now = Instant::now();
        shared.state = RunState::Running;
        shared.session = token.value();
        shared.loops = 0;
        shared.started = Some(now);
        shared.finished = None;
        shared.console = Some(Arc::clone(&console));
        drop(shared);

        tracing::info!(generation = token.value(), pins = device.pin_count(), "session started");
        let generation = token.value();
        let session = Session {
            shared: Arc::clone(&self.shared),
            cache: self.cache.clone(),
            source: source.to_string(),
            device,
            console,
            config,
            token,
            started: now,
        };
        Some(RunHandle {
            generation,
            task: tokio::spawn(session.run()),
        })
    }

    /// Stop the running session. Returns whether one was running.
    pub fn stop(&self) -> bool {
        let mut shared = self.lock();
        if shared.state != RunState::Running {
            return false;
        }
        self.generation.invalidate();
        shared.state = RunState::Stopped;
        shared.finished = Some(Instant::now());
        if let Some(console) = &shared.console {
            console.write_line(STOPPED_LINE, LogLevel::Info);
        }
        tracing::info!(generation = shared.session, loops = shared.loops, "session stopped");
        true
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let shared = self.lock();
        let elapsed = match (shared.started, shared.finished) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };
        let seconds = elapsed.as_secs_f64().max(1.0);
        SchedulerSnapshot {
            state: shared.state,
            generation: self.generation.latest_issued(),
            loops: shared.loops,
            elapsed_ms: elapsed.as_millis() as u64,
            loop_rate: (shared.loops as f64 / seconds).round(),
        }
    }
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a session's driver returned.
enum Exit {
    Stopped,
    Failed(RunError),
}

impl From<RunError> for Exit {
    fn from(err: RunError) -> Self {
        Exit::Failed(err)
    }
}

impl From<EvalError> for Exit {
    fn from(err: EvalError) -> Self {
        if err.is_stop() {
            Exit::Stopped
        } else {
            Exit::Failed(err.into())
        }
    }
}

struct Session {
    shared: Arc<Mutex<Shared>>,
    cache: CacheRef,
    source: String,
    device: Arc<dyn Device>,
    console: Arc<dyn Console>,
    config: RunConfig,
    token: RunToken,
    started: Instant,
}

impl Session {
    async fn run(self) -> RunOutcome {
        let exit = match self.drive().await {
            Ok(never) => match never {},
            Err(exit) => exit,
        };

        let outcome = match exit {
            // Only the session that still holds the live token reports.
            Exit::Failed(err) if self.token.generation().invalidate_token(&self.token) => {
                self.console.write_line(&err.to_string(), LogLevel::Error);
                tracing::warn!(
                    generation = self.token.value(),
                    kind = err.kind(),
                    error = %err,
                    "session failed"
                );
                RunOutcome::Errored(err)
            }
            _ => RunOutcome::Stopped,
        };

        let mut shared = lock_shared(&self.shared);
        if shared.session == self.token.value() {
            if let RunOutcome::Errored(_) = outcome {
                shared.state = RunState::Errored;
                shared.finished = Some(Instant::now());
            } else if shared.state == RunState::Running {
                shared.state = RunState::Stopped;
                shared.finished = Some(Instant::now());
            }
        }
        outcome
    }

    async fn drive(&self) -> Result<Infallible, Exit> {
        self.config.validate().map_err(RunError::from)?;
        self.config
            .check_device(self.device.pin_count())
            .map_err(RunError::from)?;
        validate_sketch(&self.source).map_err(RunError::from)?;

        let transformed = transpile(&self.source);
        let program = self
            .cache
            .get()
            .get_or_compile(&transformed, |src| compile(src, SKETCH_FILE))
            .map_err(RunError::Compile)?;
        for warning in program.warnings() {
            self.console.write_line(&warning.to_string(), LogLevel::Warn);
        }

        self.device.reset_clock();
        let suspend_config = self.config.suspend_config();
        let host = HostContext {
            device: Arc::clone(&self.device),
            console: Arc::clone(&self.console),
            token: self.token.clone(),
            suspend: suspend_config,
        };
        let mut sketch = Sketch::instantiate(program, host).await?;

        self.console.write_line("Running setup()...", LogLevel::Info);
        sketch.setup().await?;
        self.console
            .write_line("Entering loop()... (press Stop to halt)", LogLevel::Info);

        let max_runtime = self.config.max_runtime();
        let safety_ms = self.config.loop_safety_ms as f64;
        loop {
            sketch.run_loop().await?;
            if !self.token.is_live() {
                return Err(Exit::Stopped);
            }
            self.record_loop();
            if self.started.elapsed() > max_runtime {
                return Err(RunError::RuntimeGuard {
                    max_runtime_ms: self.config.max_runtime_ms,
                }
                .into());
            }
            if safety_ms > 0.0 {
                suspend(&self.token, safety_ms, suspend_config).await?;
            }
            tokio::task::yield_now().await;
        }
    }

    fn record_loop(&self) {
        let mut shared = lock_shared(&self.shared);
        if shared.session == self.token.value() {
            shared.loops += 1;
        }
    }
}
