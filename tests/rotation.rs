//! End-to-end rotation through the simulated tick handler.

use rrkernel::arch::sim::SimCpu;
use rrkernel::arch::LaunchPlan;
use rrkernel::config::SCHEDULER_STACK_SIZE;
use rrkernel::frame::{EXC_RETURN_THREAD_PSP, INITIAL_XPSR, SAVED_FRAME_BYTES};
use rrkernel::kernel::SchedulerStack;
use rrkernel::scheduler::Scheduler;
use rrkernel::task::{entry_address, TaskEntry};

extern "C" fn task0() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

extern "C" fn task1() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

extern "C" fn task2() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

extern "C" fn task3() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

const ENTRIES: [TaskEntry; 4] = [task0, task1, task2, task3];

struct Booted<const N: usize> {
    scheduler: Box<Scheduler<N>>,
    msp: Box<SchedulerStack>,
    cpu: SimCpu,
}

fn launch<const N: usize>(entries: [TaskEntry; N]) -> Booted<N> {
    let mut scheduler = Box::new(Scheduler::<N>::new());
    let mut msp = Box::new(SchedulerStack::EMPTY);
    let (task_stack, entry) = scheduler.init_tasks(entries);
    let mut cpu = SimCpu::new();
    cpu.launch(&LaunchPlan {
        scheduler_stack: msp.top(),
        task_stack,
        entry,
    });
    Booted { scheduler, msp, cpu }
}

fn boot<const N: usize>(entries: [TaskEntry; N]) -> (Box<Scheduler<N>>, SimCpu) {
    let Booted { scheduler, cpu, .. } = launch(entries);
    (scheduler, cpu)
}

/// Pretend the running task has been executing for a while.
fn scribble(cpu: &mut SimCpu, seed: u32) {
    for (i, r) in cpu.regs.r.iter_mut().enumerate() {
        *r = seed.wrapping_mul(0x0101_0101).wrapping_add(i as u32);
    }
    cpu.regs.lr = 0x0800_4001 + seed;
    cpu.regs.pc = 0x0800_8000 + 2 * seed;
    cpu.regs.xpsr = INITIAL_XPSR | 0x2000_0000;
}

#[test]
fn four_tasks_first_rotation() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    // Boot: task 0 entered directly, nothing popped from its stack.
    assert_eq!(scheduler.current_task(), 0);
    assert_eq!(cpu.regs.pc, entry_address(task0));
    assert_eq!(cpu.psp(), scheduler.task(0).unwrap().stack_pointer());

    // Ticks 1..=3: each task starts at its entry from the synthetic frame.
    for (tick, entry) in ENTRIES.iter().enumerate().skip(1) {
        scribble(&mut cpu, tick as u32);
        let switch = unsafe { cpu.tick(&mut *scheduler) };

        assert_eq!(switch.from, tick - 1);
        assert_eq!(switch.to, tick);
        assert_eq!(cpu.regs.pc, entry_address(*entry));
        assert_eq!(cpu.regs.lr, EXC_RETURN_THREAD_PSP);
        assert_eq!(cpu.regs.xpsr, INITIAL_XPSR);
        assert_eq!(cpu.regs.r, [0; 13]);
    }
}

#[test]
fn task_zero_resumes_mid_body_after_full_rotation() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    scribble(&mut cpu, 7);
    let task0_regs = cpu.regs;
    let task0_psp = cpu.psp();

    for _ in 0..4 {
        unsafe { cpu.tick(&mut *scheduler) };
    }

    assert_eq!(scheduler.current_task(), 0);
    assert_eq!(cpu.regs, task0_regs);
    assert_ne!(cpu.regs.pc, entry_address(task0));
    assert_eq!(cpu.psp(), task0_psp);
}

#[test]
fn current_task_is_ticks_mod_n() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);
    for ticks in 0..25usize {
        assert_eq!(scheduler.current_task(), ticks % 4);
        scribble(&mut cpu, ticks as u32);
        unsafe { cpu.tick(&mut *scheduler) };
    }
}

#[test]
fn every_task_keeps_its_own_registers() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    // First rotation: give each task a distinct register signature.
    let mut signatures = Vec::new();
    for task in 0..4u32 {
        scribble(&mut cpu, 100 + task);
        signatures.push((cpu.regs, cpu.psp()));
        unsafe { cpu.tick(&mut *scheduler) };
    }

    // Second rotation: each comes back exactly as it was preempted.
    for (task, (regs, psp)) in signatures.iter().enumerate() {
        assert_eq!(scheduler.current_task(), task);
        assert_eq!(cpu.regs, *regs);
        assert_eq!(cpu.psp(), *psp);
        unsafe { cpu.tick(&mut *scheduler) };
    }
}

#[test]
fn tick_writes_only_outgoing_tcb() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    for _ in 0..9 {
        let before: Vec<_> = (0..4).map(|i| scheduler.task(i).unwrap().stack_pointer()).collect();
        let outgoing = scheduler.current_task();

        let switch = unsafe { cpu.tick(&mut *scheduler) };

        for i in 0..4 {
            let sp = scheduler.task(i).unwrap().stack_pointer();
            if i == outgoing {
                assert_eq!(sp, switch.saved);
            } else {
                assert_eq!(sp, before[i]);
            }
        }
    }
}

#[test]
fn save_and_restore_move_sp_by_frame_size() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    for _ in 0..8 {
        let live = cpu.psp() as usize;
        let switch = unsafe { cpu.tick(&mut *scheduler) };

        // Save: hardware frame + R4–R11 below the live PSP.
        assert_eq!(live - switch.saved as usize, SAVED_FRAME_BYTES);

        // Restore: the incoming task's PSP sits exactly one frame above
        // the pointer its TCB held.
        let restored_from = scheduler.task(switch.to).unwrap().stack_pointer() as usize;
        assert_eq!(cpu.psp() as usize - restored_from, SAVED_FRAME_BYTES);
    }
}

#[test]
fn single_task_always_restores_itself() {
    let (mut scheduler, mut cpu) = boot([task0]);

    for round in 0..5 {
        scribble(&mut cpu, round);
        let regs = cpu.regs;
        let psp = cpu.psp();

        let switch = unsafe { cpu.tick(&mut *scheduler) };

        assert_eq!((switch.from, switch.to), (0, 0));
        assert_eq!(cpu.regs, regs);
        assert_eq!(cpu.psp() as usize, switch.saved as usize + SAVED_FRAME_BYTES);
        assert_eq!(cpu.psp(), psp);
    }
}

#[test]
fn suspended_frames_decode_after_switch() {
    let (mut scheduler, mut cpu) = boot(ENTRIES);

    scribble(&mut cpu, 3);
    let regs = cpu.regs;
    unsafe { cpu.tick(&mut *scheduler) };

    let frame = scheduler.saved_frame(0).unwrap();
    assert_eq!(frame.exception.pc, regs.pc);
    assert_eq!(frame.exception.r0, regs.r[0]);
    assert_eq!(frame.exception.r12, regs.r[12]);
    assert_eq!(frame.callee.r4, regs.r[4]);
    assert_eq!(frame.callee.r11, regs.r[11]);

    // Tasks 2 and 3 have not run yet.
    for (i, entry) in ENTRIES.iter().enumerate().skip(2) {
        let frame = scheduler.saved_frame(i).unwrap();
        assert_eq!(frame.exception.pc, entry_address(*entry));
        assert_eq!(frame.exception.lr, EXC_RETURN_THREAD_PSP);
        assert_eq!(frame.exception.xpsr, INITIAL_XPSR);
    }
}

#[test]
fn ticks_never_move_msp_or_touch_the_scheduler_stack() {
    let Booted { mut scheduler, mut msp, mut cpu } = launch(ENTRIES);
    let top = msp.top();
    let base = top as usize - SCHEDULER_STACK_SIZE;

    for tick in 0..12u32 {
        scribble(&mut cpu, tick);
        let switch = unsafe { cpu.tick(&mut *scheduler) };

        assert_eq!(cpu.msp(), top);
        assert!(!(base..top as usize).contains(&(switch.saved as usize)));
        assert!(!(base..top as usize).contains(&(cpu.psp() as usize)));
    }
}
