//! # rrkernel Example Firmware
//!
//! Four tasks on the STM32F4-Discovery, each blinking one LED at its own
//! rate with a busy-wait delay:
//!
//! | Task | LED | Pin | Half period |
//! |------|-----|-----|-------------|
//! | `task1_handler` | green  | PD12 | 1 s    |
//! | `task2_handler` | orange | PD13 | 500 ms |
//! | `task3_handler` | blue   | PD15 | 250 ms |
//! | `task4_handler` | red    | PD14 | 125 ms |
//!
//! None of them ever yields. Each delay simply spans many 1 ms quanta, and
//! the kernel interleaves the four loops so all LEDs blink concurrently.
//!
//! Built for the host, the binary runs the same bootstrap against the
//! simulated processor and prints the first rotations.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std, no_main)]

use rrkernel::config::SYSTEM_CLOCK_HZ;

// ---------------------------------------------------------------------------
// Board glue
// ---------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod led {
    use stm32_metapac::{self as device, gpio::vals::Moder};

    pub const GREEN: usize = 12;
    pub const ORANGE: usize = 13;
    pub const RED: usize = 14;
    pub const BLUE: usize = 15;

    /// Clock GPIOD and make PD12–PD15 push-pull outputs.
    pub fn init_all() {
        device::RCC.ahb1enr().modify(|w| w.set_gpioden(true));
        device::GPIOD.moder().modify(|w| {
            for pin in GREEN..=BLUE {
                w.set_moder(pin, Moder::OUTPUT);
            }
        });
    }

    pub fn on(pin: usize) {
        device::GPIOD.bsrr().write(|w| w.set_bs(pin, true));
    }

    pub fn off(pin: usize) {
        device::GPIOD.bsrr().write(|w| w.set_br(pin, true));
    }
}

// No GPIO on the host; the simulation never runs task bodies.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod led {
    pub const GREEN: usize = 12;
    pub const ORANGE: usize = 13;
    pub const RED: usize = 14;
    pub const BLUE: usize = 15;

    pub fn on(_pin: usize) {}

    pub fn off(_pin: usize) {}
}

fn delay_ms(ms: u32) {
    cortex_m::asm::delay(SYSTEM_CLOCK_HZ / 1000 * ms);
}

fn blink(pin: usize, half_period_ms: u32) -> ! {
    loop {
        led::on(pin);
        delay_ms(half_period_ms);
        led::off(pin);
        delay_ms(half_period_ms);
    }
}

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

extern "C" fn task1_handler() -> ! {
    blink(led::GREEN, 1000)
}

extern "C" fn task2_handler() -> ! {
    blink(led::ORANGE, 500)
}

extern "C" fn task3_handler() -> ! {
    blink(led::BLUE, 250)
}

extern "C" fn task4_handler() -> ! {
    blink(led::RED, 125)
}

// ---------------------------------------------------------------------------
// Firmware entry point
// ---------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "none"))]
use panic_halt as _;

/// Takes the core peripherals and hands them to the kernel. Does not
/// return.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[cortex_m_rt::entry]
fn main() -> ! {
    use rrkernel::arch::cortex_m4::CortexM4;
    use rrkernel::config::{MAX_TASKS, TICK_HZ};
    use rrkernel::{fault, kernel};

    let cp = cortex_m::Peripherals::take().unwrap();

    fault::log(format_args!("rrkernel: {} tasks, {} Hz tick", MAX_TASKS, TICK_HZ));

    kernel::start(
        CortexM4::new(cp.SYST, cp.SCB),
        [task1_handler, task2_handler, task3_handler, task4_handler],
        led::init_all,
    )
}

// ---------------------------------------------------------------------------
// Hosted simulation
// ---------------------------------------------------------------------------

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod hosted {
    use rrkernel::arch::sim::SimCpu;
    use rrkernel::arch::{LaunchPlan, Platform};
    use rrkernel::config::{MAX_TASKS, SYSTEM_CLOCK_HZ};
    use rrkernel::kernel;

    /// Runs the rotation on the simulated processor instead of jumping.
    pub struct HostBoard {
        pub rotations: usize,
    }

    impl Platform for HostBoard {
        fn mask_interrupts(&mut self) {}

        fn enable_fault_traps(&mut self) {
            println!("fault traps: MemManage, BusFault, UsageFault");
        }

        fn timer_clock_hz(&self) -> u32 {
            SYSTEM_CLOCK_HZ
        }

        fn arm_tick(&mut self, reload: u32) {
            println!("tick armed: reload {}", reload);
        }

        unsafe fn launch(&mut self, plan: LaunchPlan) -> ! {
            let scheduler = kernel::KERNEL.scheduler();
            let mut cpu = SimCpu::new();
            cpu.launch(&plan);
            println!("launch: task 0 called at pc={:#010x}", cpu.regs.pc);

            for tick in 1..=self.rotations * MAX_TASKS {
                let switch = cpu.tick(scheduler);
                println!(
                    "tick {}: task {} -> task {} (pc={:#010x})",
                    tick, switch.from, switch.to, cpu.regs.pc
                );
            }
            std::process::exit(0)
        }
    }

    pub fn run() -> ! {
        kernel::start(
            HostBoard { rotations: 2 },
            [
                super::task1_handler,
                super::task2_handler,
                super::task3_handler,
                super::task4_handler,
            ],
            || println!("board init: LEDs simulated"),
        )
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {
    hosted::run()
}
