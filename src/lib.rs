//! # rrkernel: Round-Robin Kernel
//!
//! A minimal preemptive, tick-driven, round-robin task scheduler for
//! single-core ARM Cortex-M4 microcontrollers with no underlying OS.
//!
//! ## Overview
//!
//! A fixed set of tasks, known at build time, each an infinite loop with its
//! own stack. Every SysTick interrupt saves the running task's registers on
//! its stack and restores the next task's in fixed cyclic order. There are
//! no priorities, no blocking and no inter-task communication: each task
//! gets exactly one tick per rotation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │            Kernel / Bootstrap (kernel.rs)               │
//! │      prepare() · start() · KERNEL · SchedulerStack      │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │  Tick Timer        │  Fault Reporting  │
//! │  scheduler.rs│  tick.rs           │  fault.rs         │
//! │  ─ switch()  │  ─ reload_value()  │  ─ report()       │
//! │  ─ advance() │  ─ configure()     │  ─ halt()         │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │     Task Model (task.rs) · Saved Frames (frame.rs)      │
//! │   TCB · TaskStack · initial frame · push/pop            │
//! ├────────────────────────────────────────────────────────┤
//! │   Arch Port (arch/): Platform · cortex_m4 · sim         │
//! │    SysTick switch · launch · fault traps                │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **Per-task stack**: `TaskStack` owned by the scheduler, one per slot
//! - **Scheduler stack**: separate buffer, MSP after launch
//! - **No locks**: the task table is written only by the bootstrap (with
//!   interrupts masked) and by the non-reentrant SysTick handler
//!
//! ## Building
//!
//! Firmware targets `thumbv7em-none-eabi`. The library and its tests also
//! build for the host, where [`arch::sim`] stands in for the processor.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod frame;
pub mod task;
pub mod scheduler;
pub mod tick;
pub mod arch;
pub mod kernel;
pub mod fault;
