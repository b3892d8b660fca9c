//! # Saved Register Frames
//!
//! Typed layout of a suspended task's context on its process stack.
//!
//! On exception entry the Cortex-M4 pushes R0–R3, R12, LR, PC and xPSR onto
//! the active stack (PSP for tasks). The tick handler then pushes R4–R11
//! below that with `stmdb`. A suspended task's saved stack pointer therefore
//! addresses a [`SavedFrame`]:
//!
//! ```text
//! High Address
//! ┌───────────────┐ <- PSP while the task was running
//! │     xPSR      │ ┐
//! │      PC       │ │
//! │      LR       │ │
//! │      R12      │ │ ExceptionFrame (hardware stacked)
//! │      R3       │ │
//! │      R2       │ │
//! │      R1       │ │
//! │      R0       │ ┘
//! ├───────────────┤
//! │      R11      │ ┐
//! │      ...      │ │ CalleeSaved (stmdb r0!, {r4-r11})
//! │      R4       │ ┘
//! └───────────────┘ <- saved stack pointer (stored in the TCB)
//! Low Address
//! ```

use core::mem::size_of;

/// xPSR with only the Thumb bit set. Loading a PC on Cortex-M with T=0
/// raises a UsageFault, so every synthetic frame carries this.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// EXC_RETURN value for "return to Thread mode, use PSP, basic frame".
///
/// Also written into the LR slot of synthetic frames.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Registers stacked by the processor on exception entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    /// Link register of the interrupted code
    pub lr: u32,
    /// Resume address
    pub pc: u32,
    pub xpsr: u32,
}

/// Callee-saved registers pushed by the tick handler.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalleeSaved {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
}

/// Full saved context of a suspended task, lowest address first.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedFrame {
    pub callee: CalleeSaved,
    pub exception: ExceptionFrame,
}

/// Bytes pushed by the processor on exception entry.
pub const EXCEPTION_FRAME_BYTES: usize = size_of::<ExceptionFrame>();

/// Bytes pushed and popped by the tick handler itself.
pub const CALLEE_SAVED_BYTES: usize = size_of::<CalleeSaved>();

/// Bytes between a task's live PSP and its saved stack pointer.
pub const SAVED_FRAME_BYTES: usize = size_of::<SavedFrame>();

const _: () = {
    assert!(EXCEPTION_FRAME_BYTES == 8 * 4);
    assert!(CALLEE_SAVED_BYTES == 8 * 4);
    assert!(SAVED_FRAME_BYTES == EXCEPTION_FRAME_BYTES + CALLEE_SAVED_BYTES);
};

impl SavedFrame {
    /// The context a never-run task is "resumed" from: every general purpose
    /// register zero, PC at `entry`, LR holding the PSP-return sentinel.
    pub const fn initial(entry: u32) -> Self {
        Self {
            callee: CalleeSaved {
                r4: 0,
                r5: 0,
                r6: 0,
                r7: 0,
                r8: 0,
                r9: 0,
                r10: 0,
                r11: 0,
            },
            exception: ExceptionFrame {
                r0: 0,
                r1: 0,
                r2: 0,
                r3: 0,
                r12: 0,
                lr: EXC_RETURN_THREAD_PSP,
                pc: entry,
                xpsr: INITIAL_XPSR,
            },
        }
    }
}

/// Push `value` onto a full-descending stack whose top is `sp`, returning
/// the new top.
///
/// # Safety
/// `sp` must be 4-byte aligned and the `size_of::<T>()` bytes below it must
/// be writable memory owned by the caller.
pub unsafe fn push<T: Copy>(sp: *mut u32, value: T) -> *mut u32 {
    let slot = (sp as *mut T).sub(1);
    slot.write(value);
    slot as *mut u32
}

/// Pop a `T` off a full-descending stack, returning it with the new top.
///
/// # Safety
/// `sp` must address a valid, 4-byte aligned `T` previously written with
/// [`push`] (or by the processor with the same layout).
pub unsafe fn pop<T: Copy>(sp: *mut u32) -> (T, *mut u32) {
    let slot = sp as *mut T;
    (slot.read(), slot.add(1) as *mut u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_frame_contents() {
        let frame = SavedFrame::initial(0x0800_1235);
        assert_eq!(frame.callee, CalleeSaved::default());
        assert_eq!(frame.exception.pc, 0x0800_1235);
        assert_eq!(frame.exception.lr, EXC_RETURN_THREAD_PSP);
        assert_eq!(frame.exception.xpsr, INITIAL_XPSR);
        assert_eq!(frame.exception.r0 | frame.exception.r3 | frame.exception.r12, 0);
    }

    #[test]
    fn test_push_pop_move_by_frame_size() {
        let mut memory = [0u32; 32];
        let top = unsafe { memory.as_mut_ptr().add(32) };

        let callee = CalleeSaved { r4: 4, r11: 11, ..Default::default() };
        let below = unsafe { push(top, callee) };
        assert_eq!(top as usize - below as usize, CALLEE_SAVED_BYTES);

        let (back, restored) = unsafe { pop::<CalleeSaved>(below) };
        assert_eq!(back, callee);
        assert_eq!(restored, top);
    }

    #[test]
    fn test_layout_matches_stmdb_order() {
        // r4 lands at the lowest address, exactly where `stmdb r0!, {r4-r11}` puts it.
        let mut memory = [0u32; 16];
        let top = unsafe { memory.as_mut_ptr().add(16) };
        let frame = SavedFrame::initial(0xCAFE_0001);
        let sp = unsafe { push(top, frame) };

        assert_eq!(sp, memory.as_mut_ptr());
        assert_eq!(memory[13], EXC_RETURN_THREAD_PSP);
        assert_eq!(memory[14], 0xCAFE_0001);
        assert_eq!(memory[15], INITIAL_XPSR);
        assert!(memory[..13].iter().all(|&w| w == 0));
    }
}
