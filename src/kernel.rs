//! # Kernel
//!
//! The process-wide kernel object and the one-time bootstrap.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         └─► kernel::start()                ← no return
//!               ├─► mask interrupts
//!               ├─► 1. enable fault traps
//!               ├─► 2. reserve the scheduler stack (MSP)
//!               ├─► 3. build initial frames for every task
//!               ├─► 4. board init (LEDs, …)
//!               ├─► 5. arm SysTick at TICK_HZ
//!               └─► 6/7. MSP/PSP switch, drop privilege, call task 0
//! ```
//!
//! Task 0 is entered by a direct call. Every later restore, including the
//! first run of tasks 1..N-1, goes through the tick handler's exception
//! return.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::{LaunchPlan, Platform};
use crate::config::{MAX_TASKS, SCHEDULER_STACK_SIZE, TICK_HZ};
use crate::error::ConfigError;
use crate::fault;
use crate::scheduler::Scheduler;
use crate::task::TaskEntry;
use crate::tick;

// ---------------------------------------------------------------------------
// Scheduler stack
// ---------------------------------------------------------------------------

/// Stack used by the tick handler and every other exception once the first
/// task has been launched. Disjoint from every task stack.
#[repr(C, align(8))]
pub struct SchedulerStack {
    words: [u32; SCHEDULER_STACK_SIZE / 4],
}

impl SchedulerStack {
    pub const EMPTY: Self = Self { words: [0; SCHEDULER_STACK_SIZE / 4] };

    pub fn top(&mut self) -> *mut u32 {
        self.words.as_mut_ptr_range().end
    }
}

// ---------------------------------------------------------------------------
// Global kernel instance
// ---------------------------------------------------------------------------

/// Owner of the scheduler and its stack for the lifetime of the program.
pub struct Kernel {
    scheduler: UnsafeCell<Scheduler<MAX_TASKS>>,
    stack: UnsafeCell<SchedulerStack>,
    started: AtomicBool,
}

// Safety: single core. The bootstrap is the only accessor until launch (with
// interrupts masked); afterwards only the tick handler touches the scheduler,
// and it cannot preempt itself.
unsafe impl Sync for Kernel {}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            scheduler: UnsafeCell::new(Scheduler::new()),
            stack: UnsafeCell::new(SchedulerStack::EMPTY),
            started: AtomicBool::new(false),
        }
    }

    /// Exclusive access to the scheduler.
    ///
    /// # Safety
    /// Only the bootstrap (before launch) and the tick handler may call
    /// this, and the reference must not outlive the call site.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn scheduler(&self) -> &mut Scheduler<MAX_TASKS> {
        &mut *self.scheduler.get()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel instance the tick handler switches on.
pub static KERNEL: Kernel = Kernel::new();

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Bootstrap steps 1–5. Leaves interrupts masked and returns the plan for
/// the final switch into task 0.
///
/// The tick is armed last, so no tick can observe a half-built task table.
pub fn prepare<P, F, const N: usize>(
    platform: &mut P,
    scheduler: &mut Scheduler<N>,
    scheduler_stack: &mut SchedulerStack,
    entries: [TaskEntry; N],
    tick_hz: u32,
    board_init: F,
) -> Result<LaunchPlan, ConfigError>
where
    P: Platform,
    F: FnOnce(),
{
    platform.mask_interrupts();

    platform.enable_fault_traps();

    let scheduler_stack = scheduler_stack.top();

    let (task_stack, entry) = scheduler.init_tasks(entries);

    board_init();

    tick::configure(platform, tick_hz)?;

    Ok(LaunchPlan { scheduler_stack, task_stack, entry })
}

/// Start the kernel. **Does not return.**
///
/// Runs the bootstrap against the global [`KERNEL`] and hands the CPU to
/// task 0. A configuration error is reported through the fault path.
///
/// # Panics
/// If called a second time.
pub fn start<P, F>(mut platform: P, entries: [TaskEntry; MAX_TASKS], board_init: F) -> !
where
    P: Platform,
    F: FnOnce(),
{
    assert!(
        !KERNEL.started.swap(true, Ordering::AcqRel),
        "kernel already started"
    );

    // Safety: first and only call; interrupts get masked before the tick is
    // armed, so nothing else can reach the scheduler until launch.
    let (scheduler, stack) = unsafe { (KERNEL.scheduler(), &mut *KERNEL.stack.get()) };

    match prepare(&mut platform, scheduler, stack, entries, TICK_HZ, board_init) {
        Ok(plan) => unsafe { platform.launch(plan) },
        Err(err) => fault::config_error(err),
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
