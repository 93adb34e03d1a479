//! The capabilities a program reaches the outside world through.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::cancel::{RunToken, SuspendConfig};

/// Pin direction. Pins start as [`PinMode::Output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinMode {
    Input,
    #[default]
    Output,
}

impl PinMode {
    pub const INPUT: &'static str = "INPUT";
    pub const OUTPUT: &'static str = "OUTPUT";

    pub fn parse(s: &str) -> Option<PinMode> {
        match s {
            Self::INPUT => Some(PinMode::Input),
            Self::OUTPUT => Some(PinMode::Output),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PinMode::Input => Self::INPUT,
            PinMode::Output => Self::OUTPUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// `pin` is the index as the program wrote it.
    #[error("Invalid pin {pin}. Use 0-{max}.", max = .count.saturating_sub(1))]
    PinRange { pin: String, count: usize },

    #[error("Pin {pin} is not OUTPUT.")]
    NotOutput { pin: usize },
}

impl DeviceError {
    pub fn pin_range(pin: impl fmt::Display, count: usize) -> Self {
        DeviceError::PinRange {
            pin: pin.to_string(),
            count,
        }
    }
}

/// An addressable strip of single-channel lights.
///
/// Levels are `0..=255`; a digital HIGH is 255. Implementations use
/// interior mutability so a running session and an observer can share one
/// device.
pub trait Device: Send + Sync {
    fn pin_count(&self) -> usize;
    fn configure_pin(&self, pin: usize, mode: PinMode) -> Result<(), DeviceError>;
    fn write_digital(&self, pin: usize, high: bool) -> Result<(), DeviceError>;
    fn write_pwm(&self, pin: usize, level: u8) -> Result<(), DeviceError>;
    fn read_state(&self, pin: usize) -> Result<u8, DeviceError>;
    /// Flip between off and full brightness, ignoring pin mode.
    fn toggle(&self, pin: usize) -> Result<(), DeviceError>;
    fn set_all(&self, level: u8);
    /// Move every level one pin towards 0; the last pin turns off.
    fn shift_left(&self);
    /// Move every level one pin away from 0; pin 0 turns off.
    fn shift_right(&self);
    /// Milliseconds since the last [`reset_clock`](Self::reset_clock).
    fn elapsed_millis(&self) -> u64;
    /// Uniform integer in `min..max`. Callers guarantee `min < max`.
    fn random_int(&self, min: i64, max: i64) -> i64;
    fn reset_clock(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Error => "[ERR]",
        }
    }
}

/// Ordered, append-only line sink for user-visible output.
pub trait Console: Send + Sync {
    fn write_line(&self, text: &str, level: LogLevel);
}

/// Everything a session's program is bound to.
#[derive(Clone)]
pub struct HostContext {
    pub device: Arc<dyn Device>,
    pub console: Arc<dyn Console>,
    pub token: RunToken,
    pub suspend: SuspendConfig,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("pins", &self.device.pin_count())
            .field("token", &self.token)
            .field("suspend", &self.suspend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_range_message() {
        let err = DeviceError::pin_range(12, 12);
        assert_eq!(err.to_string(), "Invalid pin 12. Use 0-11.");
    }

    #[test]
    fn test_not_output_message() {
        assert_eq!(
            DeviceError::NotOutput { pin: 3 }.to_string(),
            "Pin 3 is not OUTPUT."
        );
    }

    #[test]
    fn test_pin_mode_parse() {
        assert_eq!(PinMode::parse("OUTPUT"), Some(PinMode::Output));
        assert_eq!(PinMode::parse("INPUT"), Some(PinMode::Input));
        assert_eq!(PinMode::parse("output"), None);
        assert_eq!(PinMode::default(), PinMode::Output);
    }

    #[test]
    fn test_log_prefixes() {
        assert_eq!(LogLevel::Info.prefix(), "[INFO]");
        assert_eq!(LogLevel::Error.prefix(), "[ERR]");
    }
}
