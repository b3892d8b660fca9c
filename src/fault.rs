//! # Fault Reporting
//!
//! Terminal handling for processor faults and bring-up errors. Nothing is
//! recoverable: report one line, then park the core forever.
//!
//! Output goes through semihosting when the `semihosting` feature is
//! enabled on a bare-metal build; otherwise the report is silent.
//!
//! Semihosting needs an attached debugger: without one the `BKPT` it
//! issues escalates to HardFault and locks the core. [`log`] therefore
//! checks DHCSR.C_DEBUGEN first and drops the line when no debugger is
//! connected, so release firmware may keep the feature on.

use core::fmt;

use crate::error::ConfigError;

/// Processor fault categories trapped by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    HardFault,
    MemManage,
    BusFault,
    UsageFault,
}

impl FaultKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::HardFault => "Hardfault",
            Self::MemManage => "MemManage",
            Self::BusFault => "BusFault",
            Self::UsageFault => "UsageFault",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exception : {}", self.name())
    }
}

/// Report `kind` and halt.
pub fn report(kind: FaultKind) -> ! {
    log(format_args!("{}", kind));
    halt()
}

/// Report a fault together with the stacked PC and xPSR of the code that
/// raised it, then halt.
pub fn report_at(kind: FaultKind, pc: u32, xpsr: u32) -> ! {
    log(format_args!("{} (pc={:#010x} xpsr={:#010x})", kind, pc, xpsr));
    halt()
}

/// Bring-up failed before any task ran.
pub fn config_error(err: ConfigError) -> ! {
    log(format_args!("rrkernel: {}", err));
    halt()
}

/// Emit one diagnostic line. Dropped when no debugger is attached.
pub fn log(args: fmt::Arguments<'_>) {
    #[cfg(all(feature = "semihosting", target_arch = "arm", target_os = "none"))]
    if cortex_m::peripheral::DCB::is_debugger_attached() {
        cortex_m_semihosting::hprintln!("{}", args);
    }

    #[cfg(not(all(feature = "semihosting", target_arch = "arm", target_os = "none")))]
    let _ = args;
}

/// Park the core.
pub fn halt() -> ! {
    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();

        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}
