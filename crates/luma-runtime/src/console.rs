//! Console sinks.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use luma_eval::{Console, LogLevel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: LogLevel,
    pub text: String,
}

impl fmt::Display for ConsoleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.prefix(), self.text)
    }
}

/// Records every line, in order.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines rendered with their level prefixes.
    pub fn rendered(&self) -> Vec<String> {
        self.lines().iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lines().iter().filter(|line| line.level == level).count()
    }
}

impl Console for MemoryConsole {
    fn write_line(&self, text: &str, level: LogLevel) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConsoleLine {
                level,
                text: text.to_string(),
            });
    }
}

/// Prints each line to stdout with its level prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn write_line(&self, text: &str, level: LogLevel) {
        println!("{} {}", level.prefix(), text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_console_keeps_order_and_prefixes() {
        let console = MemoryConsole::new();
        console.write_line("a", LogLevel::Info);
        console.write_line("b", LogLevel::Error);
        console.write_line("c", LogLevel::Warn);
        assert_eq!(console.rendered(), vec!["[INFO] a", "[ERR] b", "[WARN] c"]);
        assert_eq!(console.count(LogLevel::Error), 1);
    }
}
