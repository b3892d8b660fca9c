//! # Architecture Abstraction Layer
//!
//! The bootstrap and the tick timer driver never touch registers directly;
//! they go through [`Platform`]. The Cortex-M4 port implements it on real
//! hardware. The `sim` module models the processor's exception entry and
//! return so the context switcher can be driven without hardware.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
pub mod sim;

use crate::task::TaskEntry;

/// Everything needed for the one-way jump into the first task.
#[derive(Clone, Copy)]
pub struct LaunchPlan {
    /// Top of the dedicated scheduler stack, loaded into MSP.
    pub scheduler_stack: *mut u32,
    /// Task 0's saved stack pointer, loaded into PSP.
    pub task_stack: *mut u32,
    /// Task 0's entry, called directly.
    pub entry: TaskEntry,
}

/// Hardware capabilities the kernel consumes.
pub trait Platform {
    /// Mask interrupts until [`launch`](Self::launch). The tick must not
    /// fire while Thread mode is still on the boot stack.
    fn mask_interrupts(&mut self);

    /// Trap MemManage, BusFault and UsageFault separately instead of
    /// escalating them to HardFault.
    fn enable_fault_traps(&mut self);

    /// Frequency of the clock feeding the tick timer.
    fn timer_clock_hz(&self) -> u32;

    /// Load the tick timer with `reload` and start it with its interrupt
    /// enabled.
    fn arm_tick(&mut self, reload: u32);

    /// Switch MSP to the scheduler stack, Thread mode to PSP at the first
    /// task's stack, drop privilege, unmask interrupts and call the first
    /// task.
    ///
    /// # Safety
    /// Every pointer in `plan` must come from an initialized scheduler that
    /// stays in place for the rest of the program. The caller's stack frame
    /// is abandoned.
    unsafe fn launch(&mut self, plan: LaunchPlan) -> !;
}
