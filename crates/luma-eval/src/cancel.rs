//! Generation-token cancellation and the suspending `delay` primitive.
//!
//! A [`Generation`] hands out strictly increasing tokens. Only the most
//! recently issued token is live; invalidating it (or issuing a newer one)
//! makes every copy held by the old session stale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Default polling tick for [`suspend`].
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
pub struct Generation {
    issued: AtomicU64,
    /// Live token value, 0 when none.
    current: AtomicU64,
}

impl Generation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Issue a token greater than every earlier one and make it live.
    pub fn issue(self: &Arc<Self>) -> RunToken {
        let value = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(value, Ordering::SeqCst);
        RunToken {
            generation: Arc::clone(self),
            value,
        }
    }

    pub fn invalidate(&self) {
        self.current.store(0, Ordering::SeqCst);
    }

    /// Invalidate only if `token` is still the live one.
    pub fn invalidate_token(&self, token: &RunToken) -> bool {
        self.current
            .compare_exchange(token.value, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// The live token value, 0 when none.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct RunToken {
    generation: Arc<Generation>,
    value: u64,
}

impl RunToken {
    /// A live token from a private generation, for running a program
    /// outside a scheduler.
    pub fn detached() -> Self {
        Generation::new().issue()
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_live(&self) -> bool {
        self.generation.current() == self.value
    }

    pub fn ensure_live(&self) -> EvalResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(EvalError::Stopped)
        }
    }

    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }
}

impl fmt::Debug for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunToken")
            .field("value", &self.value)
            .field("live", &self.is_live())
            .finish()
    }
}

/// What `delay(0)` (or a negative delay) does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroDelayPolicy {
    /// Yield to the executor once.
    #[default]
    Yield,
    /// Return immediately.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspendConfig {
    pub tick: Duration,
    pub zero_delay: ZeroDelayPolicy,
}

impl Default for SuspendConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            zero_delay: ZeroDelayPolicy::default(),
        }
    }
}

/// Suspend for `ms` milliseconds, waking every tick to check `token`.
///
/// Returns [`EvalError::Stopped`] within one tick of the token going stale.
pub async fn suspend(token: &RunToken, ms: f64, config: SuspendConfig) -> EvalResult<()> {
    token.ensure_live()?;

    let ms = if ms.is_nan() { 0.0 } else { ms };
    if ms <= 0.0 {
        if config.zero_delay == ZeroDelayPolicy::Yield {
            tokio::task::yield_now().await;
        }
        return token.ensure_live();
    }

    let total = Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX);
    let tick = config.tick.max(Duration::from_millis(1));
    let start = tokio::time::Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= total {
            return Ok(());
        }
        tokio::time::sleep((total - elapsed).min(tick)).await;
        token.ensure_live()?;
    }
}
