//! # Simulated Cortex-M Port
//!
//! A software model of the parts of the processor the context switcher
//! depends on: the register file, PSP, hardware stacking on exception entry
//! and unstacking on exception return. [`SimCpu::tick`] performs the same
//! steps, in the same order, as the assembly `SysTick` handler in
//! `cortex_m4`, against real task stacks owned by a [`Scheduler`].
//!
//! Not modelled: FPU frames, the STKALIGN padding word (task stacks stay
//! 8-byte aligned here because simulated tasks never push), and priority.

use crate::arch::LaunchPlan;
use crate::frame::{self, CalleeSaved, ExceptionFrame};
use crate::scheduler::Scheduler;
use crate::task::entry_address;

/// Core registers visible to a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    /// R0–R12
    pub r: [u32; 13],
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

impl Registers {
    fn exception_frame(&self) -> ExceptionFrame {
        ExceptionFrame {
            r0: self.r[0],
            r1: self.r[1],
            r2: self.r[2],
            r3: self.r[3],
            r12: self.r[12],
            lr: self.lr,
            pc: self.pc,
            xpsr: self.xpsr,
        }
    }

    fn load_exception_frame(&mut self, f: ExceptionFrame) {
        self.r[0] = f.r0;
        self.r[1] = f.r1;
        self.r[2] = f.r2;
        self.r[3] = f.r3;
        self.r[12] = f.r12;
        self.lr = f.lr;
        self.pc = f.pc;
        self.xpsr = f.xpsr;
    }

    fn callee_saved(&self) -> CalleeSaved {
        let r = &self.r;
        CalleeSaved {
            r4: r[4],
            r5: r[5],
            r6: r[6],
            r7: r[7],
            r8: r[8],
            r9: r[9],
            r10: r[10],
            r11: r[11],
        }
    }

    fn load_callee_saved(&mut self, c: CalleeSaved) {
        self.r[4..12].copy_from_slice(&[c.r4, c.r5, c.r6, c.r7, c.r8, c.r9, c.r10, c.r11]);
    }
}

/// What one simulated tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub from: usize,
    pub to: usize,
    /// Stack pointer recorded in the outgoing task's TCB.
    pub saved: *mut u32,
}

/// Processor state after reset: privileged, Thread mode on MSP.
pub struct SimCpu {
    pub regs: Registers,
    psp: *mut u32,
    msp: *mut u32,
    thread_uses_psp: bool,
    privileged: bool,
    launched: bool,
}

impl SimCpu {
    pub const fn new() -> Self {
        Self {
            regs: Registers { r: [0; 13], lr: 0, pc: 0, xpsr: 0 },
            psp: core::ptr::null_mut(),
            msp: core::ptr::null_mut(),
            thread_uses_psp: false,
            privileged: true,
            launched: false,
        }
    }

    pub fn psp(&self) -> *mut u32 {
        self.psp
    }

    pub fn msp(&self) -> *mut u32 {
        self.msp
    }

    pub fn thread_uses_psp(&self) -> bool {
        self.thread_uses_psp
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }

    /// Same effect as `CortexM4::launch`: MSP to the scheduler stack, PSP
    /// to task 0's saved stack pointer, unprivileged Thread mode on PSP,
    /// then a plain call into task 0 (no frame is popped).
    pub fn launch(&mut self, plan: &LaunchPlan) {
        self.msp = plan.scheduler_stack;
        self.psp = plan.task_stack;
        self.thread_uses_psp = true;
        self.privileged = false;
        self.regs.pc = entry_address(plan.entry);
        self.launched = true;
    }

    /// One SysTick: exception entry, the handler body, exception return.
    ///
    /// # Safety
    /// [`launch`](Self::launch) must have run with a plan built from
    /// `scheduler`, and `scheduler` must not have moved since.
    pub unsafe fn tick<const N: usize>(&mut self, scheduler: &mut Scheduler<N>) -> Switch {
        assert!(self.launched, "tick before launch");

        // Exception entry: hardware stacks the caller-saved set on PSP.
        // LR now holds EXC_RETURN_THREAD_PSP.
        self.psp = frame::push(self.psp, self.regs.exception_frame());

        // mrs r0, psp ; stmdb r0!, {r4-r11}
        let from = scheduler.current_task();
        let saved = frame::push(self.psp, self.regs.callee_saved());

        // bl switch_context
        let next = scheduler.switch_context(saved);
        let to = scheduler.current_task();

        // ldmia r0!, {r4-r11} ; msr psp, r0
        let (callee, sp) = frame::pop::<CalleeSaved>(next);
        self.regs.load_callee_saved(callee);
        self.psp = sp;

        // bx lr: unstack from PSP back into Thread mode.
        let (hw, sp) = frame::pop::<ExceptionFrame>(self.psp);
        self.regs.load_exception_frame(hw);
        self.psp = sp;

        Switch { from, to, saved }
    }
}

impl Default for SimCpu {
    fn default() -> Self {
        Self::new()
    }
}
