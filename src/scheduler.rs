//! # Scheduler
//!
//! The task table and the round-robin policy.
//!
//! ## Scheduling Algorithm
//!
//! At each SysTick interrupt the tick handler hands the preempted task's
//! stack pointer (R4–R11 already pushed) to [`Scheduler::switch_context`],
//! which:
//! 1. Stores it into the current task's TCB
//! 2. Advances `current_task` to `(current_task + 1) % N`
//! 3. Returns the next task's saved stack pointer for the handler to restore
//!
//! There is no readiness check and no weighting: every task gets exactly one
//! tick per cycle of `N` ticks.

use crate::frame::{self, SavedFrame};
use crate::task::{TaskControlBlock, TaskEntry, TaskStack};

/// Central scheduler state: the TCB table, each task's stack, and the index
/// of the task that owns the CPU.
///
/// TCBs hold raw pointers into `stacks`, so a scheduler must stay at a
/// fixed address once [`init_tasks`](Self::init_tasks) has run. The kernel
/// keeps its instance in a `static`.
pub struct Scheduler<const N: usize> {
    tasks: [TaskControlBlock; N],
    pub(crate) stacks: [TaskStack; N],
    current_task: usize,
}

impl<const N: usize> Scheduler<N> {
    const NON_EMPTY: () = assert!(N > 0, "a scheduler needs at least one task");

    pub const fn new() -> Self {
        let () = Self::NON_EMPTY;
        Self {
            tasks: [TaskControlBlock::UNSET; N],
            stacks: [TaskStack::EMPTY; N],
            current_task: 0,
        }
    }

    /// Build a synthetic initial frame for every task and point its TCB at
    /// it. Task 0 becomes current.
    ///
    /// Returns the stack pointer and entry task 0 is launched with.
    pub fn init_tasks(&mut self, entries: [TaskEntry; N]) -> (*mut u32, TaskEntry) {
        for (i, entry) in entries.into_iter().enumerate() {
            self.tasks[i].init(entry, &mut self.stacks[i]);
        }
        self.current_task = 0;
        (self.tasks[0].stack_pointer, entries[0])
    }

    /// Index of the task owning the CPU.
    #[inline]
    pub fn current_task(&self) -> usize {
        self.current_task
    }

    pub fn task(&self, id: usize) -> Option<&TaskControlBlock> {
        self.tasks.get(id)
    }

    /// Saved stack pointer of the current task, as last recorded.
    pub fn current_stack_pointer(&self) -> *mut u32 {
        self.tasks[self.current_task].stack_pointer
    }

    /// Record the live stack pointer of the task being switched away from.
    pub fn save_stack_pointer(&mut self, sp: *mut u32) {
        self.tasks[self.current_task].stack_pointer = sp;
    }

    /// Round-robin selection of the next task.
    pub fn advance(&mut self) {
        self.current_task = (self.current_task + 1) % N;
    }

    /// Context Switcher core. `saved` is the preempted task's PSP after the
    /// callee-saved registers have been pushed; the return value is the
    /// next task's PSP with its callee-saved registers still on the stack.
    ///
    /// Only the outgoing task's TCB is written.
    pub fn switch_context(&mut self, saved: *mut u32) -> *mut u32 {
        self.save_stack_pointer(saved);
        self.advance();
        self.current_stack_pointer()
    }

    /// Decode the saved context of a suspended task.
    ///
    /// Returns `None` for the running task (its TCB copy is stale) and for
    /// slots whose stack pointer does not address a frame in their stack.
    pub fn saved_frame(&self, id: usize) -> Option<SavedFrame> {
        if id == self.current_task {
            return None;
        }
        let tcb = self.tasks.get(id)?;
        if !self.stacks[id].holds_frame(tcb.stack_pointer) {
            return None;
        }
        // Safety: bounds and alignment checked against the task's own stack.
        let (frame, _) = unsafe { frame::pop::<SavedFrame>(tcb.stack_pointer) };
        Some(frame)
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{EXC_RETURN_THREAD_PSP, INITIAL_XPSR, SAVED_FRAME_BYTES};
    use crate::task::entry_address;

    extern "C" fn task_a() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    extern "C" fn task_b() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    extern "C" fn task_c() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn three() -> Box<Scheduler<3>> {
        let mut s = Box::new(Scheduler::<3>::new());
        s.init_tasks([task_a, task_b, task_c]);
        s
    }

    #[test]
    fn test_initial_frames_for_every_task() {
        let s = three();
        let entries = [task_a as TaskEntry, task_b, task_c];

        // Before launch every slot, task 0 included, holds its synthetic
        // frame at the recorded stack pointer.
        for (i, entry) in entries.iter().enumerate() {
            let sp = s.task(i).unwrap().stack_pointer();
            assert!(s.stacks[i].holds_frame(sp));
            let (frame, above) = unsafe { frame::pop::<SavedFrame>(sp) };
            assert_eq!(above as usize - sp as usize, SAVED_FRAME_BYTES);
            assert_eq!(frame.exception.xpsr, INITIAL_XPSR);
            assert_eq!(frame.exception.pc, entry_address(*entry));
            assert_eq!(frame.exception.lr, EXC_RETURN_THREAD_PSP);
            assert_eq!(frame.exception.r0, 0);
            assert_eq!(frame.callee, Default::default());
        }
    }

    #[test]
    fn test_round_robin_is_tick_mod_n() {
        let mut s = three();
        for ticks in 0..10 {
            assert_eq!(s.current_task(), ticks % 3);
            let sp = s.current_stack_pointer();
            s.switch_context(sp);
        }
    }

    #[test]
    fn test_switch_touches_only_outgoing_tcb() {
        let mut s = three();
        let before: [*mut u32; 3] = core::array::from_fn(|i| s.task(i).unwrap().stack_pointer());

        let outgoing = s.current_task();
        let new_sp = before[outgoing].wrapping_sub(SAVED_FRAME_BYTES / 4);
        let next = s.switch_context(new_sp);

        assert_eq!(s.task(outgoing).unwrap().stack_pointer(), new_sp);
        for i in 0..3 {
            if i != outgoing {
                assert_eq!(s.task(i).unwrap().stack_pointer(), before[i]);
            }
        }
        assert_eq!(next, before[1]);
    }

    #[test]
    fn test_single_task_restores_itself() {
        let mut s = Box::new(Scheduler::<1>::new());
        s.init_tasks([task_a]);
        let sp = s.current_stack_pointer();
        assert_eq!(s.switch_context(sp), sp);
        assert_eq!(s.current_task(), 0);
    }

    #[test]
    fn test_saved_frame_hidden_for_running_task() {
        let s = three();
        assert!(s.saved_frame(0).is_none());
        assert!(s.saved_frame(1).is_some());
        assert!(s.saved_frame(3).is_none());
    }

    #[test]
    fn test_init_tasks_returns_task_zero_launch_point() {
        let mut s = Box::new(Scheduler::<3>::new());
        let (sp, entry) = s.init_tasks([task_a, task_b, task_c]);
        assert_eq!(sp, s.task(0).unwrap().stack_pointer());
        assert_eq!(sp, s.current_stack_pointer());
        assert_eq!(entry_address(entry), entry_address(task_a));
    }

    #[test]
    fn test_reinit_resets_rotation() {
        let mut s = three();
        let sp = s.current_stack_pointer();
        s.switch_context(sp);
        assert_eq!(s.current_task(), 1);

        let (sp, _) = s.init_tasks([task_a, task_b, task_c]);
        assert_eq!(s.current_task(), 0);
        assert!(s.saved_frame(1).is_some());
        assert_eq!(sp, s.task(0).unwrap().stack_pointer());
    }
}
