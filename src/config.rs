//! # rrkernel Configuration
//!
//! Compile-time constants governing the scheduler and system behavior.
//! Nothing here is adjustable at run time: the task set, its stacks and the
//! tick rate are all fixed when the firmware is built.

/// Number of tasks in the rotation. Every slot is populated at boot and
/// no task is ever created or destroyed afterwards.
pub const MAX_TASKS: usize = 4;

/// Per-task stack size in bytes. Must hold the task's deepest call chain
/// plus one saved context (32 bytes hardware frame + 32 bytes R4–R11).
pub const TASK_STACK_SIZE: usize = 1024;

/// Size in bytes of the stack used by the bootstrap after launch and by
/// every exception handler (MSP).
pub const SCHEDULER_STACK_SIZE: usize = 1024;

/// SysTick frequency in Hz. One tick is one scheduling quantum.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 running from the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

const _: () = {
    assert!(MAX_TASKS > 0, "at least one task is required");
    assert!(TASK_STACK_SIZE % 8 == 0, "task stacks must keep 8-byte alignment");
    assert!(SCHEDULER_STACK_SIZE % 8 == 0, "scheduler stack must keep 8-byte alignment");
    assert!(
        TASK_STACK_SIZE >= 2 * crate::frame::SAVED_FRAME_BYTES,
        "task stack cannot hold a saved context"
    );
};
