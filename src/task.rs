//! # Task Control Block
//!
//! Defines the task model for rrkernel. A task is a non-terminating function
//! paired with a private stack; its TCB remembers where on that stack its
//! context was last saved.
//!
//! Tasks never leave the rotation. `state` and `block_count` are carried
//! for layout compatibility with a blocking kernel, but nothing in the
//! scheduler reads them: every task is always runnable.

use crate::config::TASK_STACK_SIZE;
use crate::frame::{self, SavedFrame};

/// Task entry function. Tasks are infinite loops and never return.
pub type TaskEntry = extern "C" fn() -> !;

/// Execution state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task is part of the rotation.
    Ready,
    /// Reserved. No component moves a task into this state.
    Blocked,
}

// ---------------------------------------------------------------------------
// Task stack
// ---------------------------------------------------------------------------

const STACK_WORDS: usize = TASK_STACK_SIZE / 4;

/// Private stack memory of one task. Aligned to 8 bytes as required by
/// the ARM AAPCS at public interfaces.
#[repr(C, align(8))]
pub struct TaskStack {
    words: [u32; STACK_WORDS],
}

impl TaskStack {
    pub const EMPTY: Self = Self { words: [0; STACK_WORDS] };

    /// One past the highest word of the stack (full-descending initial SP).
    pub fn top(&mut self) -> *mut u32 {
        self.words.as_mut_ptr_range().end
    }

    /// Lowest address of the stack.
    pub fn base(&self) -> *const u32 {
        self.words.as_ptr()
    }

    /// Whether `sp` addresses a complete [`SavedFrame`] inside this stack.
    pub fn holds_frame(&self, sp: *const u32) -> bool {
        let base = self.words.as_ptr() as usize;
        let end = base + TASK_STACK_SIZE;
        let sp = sp as usize;
        sp >= base && sp + frame::SAVED_FRAME_BYTES <= end && sp % 4 == 0
    }

    /// Stack-Frame Initializer.
    ///
    /// Writes a synthetic saved context at the top of the stack so that the
    /// tick handler can restore it exactly as it would a preempted task:
    /// `ldmia` takes the zeroed R4–R11, then exception return pops R0–R3,
    /// R12 (zero), LR (PSP sentinel), PC (`entry`) and xPSR (Thumb).
    ///
    /// Returns the saved stack pointer for the TCB.
    pub fn init_frame(&mut self, entry: TaskEntry) -> *mut u32 {
        let top = self.top();
        // Safety: `top` is the end of our own buffer and the const
        // assertions in `config` guarantee room for a full frame.
        unsafe { frame::push(top, SavedFrame::initial(entry_address(entry))) }
    }
}

/// Address the processor branches to for `entry` (Thumb bit included).
#[inline]
pub fn entry_address(entry: TaskEntry) -> u32 {
    entry as usize as u32
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB).
///
/// Index in the scheduler's table is the task identifier.
#[derive(Clone, Copy)]
pub struct TaskControlBlock {
    /// Saved stack pointer (PSP). Valid while the task is not running.
    pub(crate) stack_pointer: *mut u32,

    /// Reserved blocking counter.
    pub(crate) block_count: u32,

    pub(crate) state: TaskState,

    /// Entry point, consumed once by the stack-frame initializer.
    pub(crate) entry: Option<TaskEntry>,
}

// Safety: `stack_pointer` only ever points into the task's own stack, and
// TCBs are mutated only from the bootstrap (interrupts masked) or the tick
// handler (non-reentrant).
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// A slot that has not been given a task yet.
    pub const UNSET: Self = Self {
        stack_pointer: core::ptr::null_mut(),
        block_count: 0,
        state: TaskState::Ready,
        entry: None,
    };

    /// Bind `entry` to this slot and build its initial frame on `stack`.
    pub fn init(&mut self, entry: TaskEntry, stack: &mut TaskStack) {
        self.entry = Some(entry);
        self.state = TaskState::Ready;
        self.block_count = 0;
        self.stack_pointer = stack.init_frame(entry);
    }

    pub fn stack_pointer(&self) -> *mut u32 {
        self.stack_pointer
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn entry(&self) -> Option<TaskEntry> {
        self.entry
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
