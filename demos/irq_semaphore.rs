//! Interrupt to task signalling through a semaphore
//!
//! A timer task pends EXTI0 in software; the installed handler gives the
//! semaphore and the worker task wakes on the next tick.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use defmt::info;
use edurtos::sem::Semaphore;
use edurtos::{os_install_irq, os_task_create, os_task_delay, Irq, OsHooks};

/// EXTI line 0 on STM32F401
const EXTI0_IRQ: Irq = Irq::new(6);

edurtos::os_irq_vector!(EXTI0, 6);

static SIGNAL: Semaphore = Semaphore::new();
static EVENTS: AtomicU32 = AtomicU32::new(0);

fn on_exti0(_: *mut ()) {
    EVENTS.fetch_add(1, Ordering::Relaxed);
    // A give while the last one is still unconsumed just coalesces
    let _ = SIGNAL.give();
}

extern "C" fn trigger_task(_: *mut ()) -> ! {
    loop {
        let _ = os_task_delay(250);
        NVIC::pend(EXTI0_IRQ);
    }
}

extern "C" fn worker_task(_: *mut ()) -> ! {
    loop {
        if SIGNAL.take().is_ok() {
            info!("event {} at tick {}", EVENTS.load(Ordering::Relaxed), edurtos::os_get_tick_counter());
        }
    }
}

#[entry]
fn main() -> ! {
    info!("IRQ/Semaphore Demo");

    if let Err(e) = edurtos::os_init(OsHooks::DEFAULT) {
        defmt::panic!("OS init failed: {}", e);
    }
    SIGNAL.init();

    if let Err(e) = os_install_irq(EXTI0_IRQ, on_exti0, core::ptr::null_mut()) {
        defmt::panic!("irq install failed: {}", e);
    }

    let _ = os_task_create(worker_task, "Worker", 3, core::ptr::null_mut());
    let _ = os_task_create(trigger_task, "Trigger", 1, core::ptr::null_mut());

    let _ = edurtos::os_start_scheduler();

    loop { cortex_m::asm::wfi(); }
}
