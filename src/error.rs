//! Kernel error types

use core::fmt;

/// Build-time configuration rejected while bringing the kernel up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Tick frequency of 0 Hz
    ZeroFrequency,
    /// Tick faster than the timer clock can count
    TickTooFast {
        tick_hz: u32,
        clock_hz: u32,
    },
    /// Reload value does not fit the 24-bit SysTick counter
    TickTooSlow {
        reload: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFrequency => write!(f, "tick frequency must be non-zero"),
            Self::TickTooFast { tick_hz, clock_hz } => {
                write!(f, "{} Hz tick is too fast for a {} Hz clock", tick_hz, clock_hz)
            }
            Self::TickTooSlow { reload } => {
                write!(f, "reload value {:#x} exceeds the 24-bit timer", reload)
            }
        }
    }
}
