//! # Tick Timer Driver
//!
//! Arms the periodic timer that drives the context switcher. Each expiry is
//! one scheduling quantum.

use crate::arch::Platform;
use crate::error::ConfigError;

/// Largest value the 24-bit SysTick reload register can hold.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Reload value producing `tick_hz` interrupts per second from a
/// `clock_hz` timer clock.
pub fn reload_value(clock_hz: u32, tick_hz: u32) -> Result<u32, ConfigError> {
    if tick_hz == 0 {
        return Err(ConfigError::ZeroFrequency);
    }
    let cycles = clock_hz / tick_hz;
    if cycles < 2 {
        // A reload of 0 never raises the interrupt.
        return Err(ConfigError::TickTooFast { tick_hz, clock_hz });
    }
    let reload = cycles - 1;
    if reload > MAX_RELOAD {
        return Err(ConfigError::TickTooSlow { reload });
    }
    Ok(reload)
}

/// Arm the tick at `tick_hz`. Returns the reload value written.
pub fn configure<P: Platform>(platform: &mut P, tick_hz: u32) -> Result<u32, ConfigError> {
    let reload = reload_value(platform.timer_clock_hz(), tick_hz)?;
    platform.arm_tick(reload);
    Ok(reload)
}
