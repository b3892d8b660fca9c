//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! SysTick configuration, fault enables, the first-task launch, and the
//! SysTick handler that performs the context switch.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by exception handlers, here the
//!   dedicated scheduler stack once the kernel has started
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR, PC,
//! and xPSR onto the process stack. The SysTick handler manually saves and
//! restores R4–R11, which completes the full context save/restore.
//!
//! The switch happens directly in SysTick; there is no PendSV deferral.
//! SysTick keeps its reset priority and, being an exception, cannot preempt
//! itself.

use core::arch::{asm, global_asm};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m_rt::{exception, ExceptionFrame};

use crate::arch::{LaunchPlan, Platform};
use crate::config::SYSTEM_CLOCK_HZ;
use crate::fault::{self, FaultKind};

/// SHCSR.MEMFAULTENA
const MEMFAULTENA: u32 = 1 << 16;
/// SHCSR.BUSFAULTENA
const BUSFAULTENA: u32 = 1 << 17;
/// SHCSR.USGFAULTENA
const USGFAULTENA: u32 = 1 << 18;

/// CONTROL.nPRIV: Thread mode is unprivileged.
const CONTROL_NPRIV: u32 = 1 << 0;
/// CONTROL.SPSEL: Thread mode uses PSP.
const CONTROL_SPSEL: u32 = 1 << 1;

/// The core peripherals the kernel drives.
pub struct CortexM4 {
    syst: SYST,
    scb: SCB,
}

impl CortexM4 {
    pub fn new(syst: SYST, scb: SCB) -> Self {
        Self { syst, scb }
    }
}

impl Platform for CortexM4 {
    fn mask_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn enable_fault_traps(&mut self) {
        // Safety: read-modify-write of the fault enable bits only.
        unsafe {
            self.scb
                .shcsr
                .modify(|r| r | MEMFAULTENA | BUSFAULTENA | USGFAULTENA);
        }
    }

    fn timer_clock_hz(&self) -> u32 {
        SYSTEM_CLOCK_HZ
    }

    fn arm_tick(&mut self, reload: u32) {
        self.syst.set_reload(reload);
        self.syst.clear_current();
        self.syst.set_clock_source(SystClkSource::Core);
        self.syst.enable_interrupt();
        self.syst.enable_counter();
    }

    /// Steps 6 and 7 of the bootstrap.
    ///
    /// MSP moves to the scheduler stack here rather than earlier: the boot
    /// code's own frame lives on MSP until this point and is abandoned now.
    /// Interrupts are unmasked while still privileged (CPSIE is ignored in
    /// unprivileged Thread mode); a tick landing between `cpsie` and the
    /// branch simply saves this sequence as task 0's context.
    unsafe fn launch(&mut self, plan: LaunchPlan) -> ! {
        asm!(
            "msr msp, {msp}",
            "msr psp, {psp}",
            "msr control, {spsel}",
            "isb",
            "cpsie i",
            "msr control, {unpriv}",
            "isb",
            "blx {entry}",
            // Task 0 returned: idle.
            "1:",
            "b 1b",
            msp = in(reg) plan.scheduler_stack,
            psp = in(reg) plan.task_stack,
            spsel = in(reg) CONTROL_SPSEL,
            unpriv = in(reg) CONTROL_SPSEL | CONTROL_NPRIV,
            entry = in(reg) plan.entry as usize,
            options(noreturn)
        );
    }
}

// ---------------------------------------------------------------------------
// SysTick handler (context switch)
// ---------------------------------------------------------------------------

/// Called from the SysTick handler with the preempted task's PSP (R4–R11
/// already pushed); returns the PSP to restore.
///
/// # Safety
/// Only called from `SysTick`, which cannot preempt itself.
unsafe extern "C" fn switch_context(saved: *mut u32) -> *mut u32 {
    crate::kernel::KERNEL.scheduler().switch_context(saved)
}

// SysTick exception handler.
//
// 1. Read the live PSP
// 2. Push R4–R11 onto the task stack
// 3-5. switch_context: store PSP in the TCB, advance, load the next PSP
// 6. Pop R4–R11 from the next task's stack and update PSP
// 7. Exception return (EXC_RETURN in LR) unstacks R0–R3, R12, LR, PC, xPSR
//
// R3 is pushed alongside LR to keep MSP 8-byte aligned across the call; its
// value is discarded because exception return reloads R3 from the frame.
global_asm!(
    ".syntax unified",
    ".thumb",
    ".section .text.SysTick",
    ".global SysTick",
    ".type SysTick, %function",
    ".thumb_func",
    "SysTick:",
    "    mrs r0, psp",
    "    stmdb r0!, {{r4-r11}}",
    "    push {{r3, lr}}",
    "    bl {switch}",
    "    ldmia r0!, {{r4-r11}}",
    "    msr psp, r0",
    "    pop {{r3, lr}}",
    "    bx lr",
    ".size SysTick, . - SysTick",
    switch = sym switch_context,
);

// ---------------------------------------------------------------------------
// Fault handlers
// ---------------------------------------------------------------------------

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    fault::report_at(FaultKind::HardFault, ef.pc(), ef.xpsr())
}

#[exception]
fn MemoryManagement() -> ! {
    fault::report(FaultKind::MemManage)
}

#[exception]
fn BusFault() -> ! {
    fault::report(FaultKind::BusFault)
}

#[exception]
fn UsageFault() -> ! {
    fault::report(FaultKind::UsageFault)
}
