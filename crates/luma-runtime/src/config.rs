//! Run configuration.

use std::time::Duration;

use luma_eval::{SuspendConfig, ZeroDelayPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Loop safety delay must be in range 0..2000ms.")]
    LoopSafety(u64),

    #[error("Max runtime must be in range 100..120000ms.")]
    MaxRuntime(u64),

    #[error("Pin count must be in range 1..64.")]
    PinCount(usize),

    #[error("Poll tick must be in range 1..250ms.")]
    PollTick(u64),

    #[error("Device has {device} pins but the configuration expects {configured}.")]
    DevicePins { configured: usize, device: usize },

    #[error("invalid run configuration: {0}")]
    Parse(String),
}

/// Settings for one session. Every field has a default, so a partial JSON
/// object is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Wall-clock limit for a whole session.
    pub max_runtime_ms: u64,
    /// Pause inserted after every `loop` iteration.
    pub loop_safety_ms: u64,
    pub pin_count: usize,
    /// How often a suspended `delay` re-checks for stop.
    pub poll_tick_ms: u64,
    pub zero_delay: ZeroDelayPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_runtime_ms: 15_000,
            loop_safety_ms: 0,
            pin_count: 12,
            poll_tick_ms: 16,
            zero_delay: ZeroDelayPolicy::Yield,
        }
    }
}

impl RunConfig {
    pub const LOOP_SAFETY_MAX_MS: u64 = 2_000;
    pub const MAX_RUNTIME_RANGE_MS: (u64, u64) = (100, 120_000);
    pub const MAX_PINS: usize = 64;
    pub const POLL_TICK_MAX_MS: u64 = 250;

    /// Parse JSON and validate the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_safety_ms > Self::LOOP_SAFETY_MAX_MS {
            return Err(ConfigError::LoopSafety(self.loop_safety_ms));
        }
        let (min, max) = Self::MAX_RUNTIME_RANGE_MS;
        if !(min..=max).contains(&self.max_runtime_ms) {
            return Err(ConfigError::MaxRuntime(self.max_runtime_ms));
        }
        if !(1..=Self::MAX_PINS).contains(&self.pin_count) {
            return Err(ConfigError::PinCount(self.pin_count));
        }
        if !(1..=Self::POLL_TICK_MAX_MS).contains(&self.poll_tick_ms) {
            return Err(ConfigError::PollTick(self.poll_tick_ms));
        }
        Ok(())
    }

    /// Pin indices are range-checked by the device, so its size must
    /// match `pin_count`.
    pub fn check_device(&self, device_pins: usize) -> Result<(), ConfigError> {
        if device_pins != self.pin_count {
            return Err(ConfigError::DevicePins {
                configured: self.pin_count,
                device: device_pins,
            });
        }
        Ok(())
    }

    pub fn max_runtime(&self) -> Duration {
        Duration::from_millis(self.max_runtime_ms)
    }

    pub fn suspend_config(&self) -> SuspendConfig {
        SuspendConfig {
            tick: Duration::from_millis(self.poll_tick_ms),
            zero_delay: self.zero_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_loop_safety_checked_first() {
        let config = RunConfig {
            loop_safety_ms: 2_001,
            max_runtime_ms: 5,
            ..RunConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Loop safety delay must be in range 0..2000ms.");
    }

    #[test]
    fn test_max_runtime_bounds() {
        for ms in [99, 120_001] {
            let config = RunConfig {
                max_runtime_ms: ms,
                ..RunConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::MaxRuntime(ms)));
        }
        for ms in [100, 120_000] {
            let config = RunConfig {
                max_runtime_ms: ms,
                ..RunConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_pin_count_bounds() {
        let config = RunConfig {
            pin_count: 0,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PinCount(0)));
    }

    #[test]
    fn test_device_must_match_pin_count() {
        let config = RunConfig {
            pin_count: 1,
            ..RunConfig::default()
        };
        assert_eq!(config.check_device(1), Ok(()));
        let err = config.check_device(12).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DevicePins {
                configured: 1,
                device: 12
            }
        );
        assert_eq!(
            err.to_string(),
            "Device has 12 pins but the configuration expects 1."
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RunConfig::from_json_str(r#"{"pin_count": 1, "zero_delay": "skip"}"#).unwrap();
        assert_eq!(config.pin_count, 1);
        assert_eq!(config.zero_delay, ZeroDelayPolicy::Skip);
        assert_eq!(config.max_runtime_ms, 15_000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = RunConfig::from_json_str(r#"{"pins": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_json_is_validated() {
        let err = RunConfig::from_json_str(r#"{"poll_tick_ms": 0}"#).unwrap_err();
        assert_eq!(err, ConfigError::PollTick(0));
    }

    #[test]
    fn test_suspend_config_uses_tick() {
        let config = RunConfig {
            poll_tick_ms: 5,
            ..RunConfig::default()
        };
        assert_eq!(config.suspend_config().tick, Duration::from_millis(5));
    }
}
