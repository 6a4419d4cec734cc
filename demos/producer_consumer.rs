//! Producer-Consumer example with a message queue

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use defmt::info;
use edurtos::queue::Queue;
use edurtos::{os_task_create, os_task_delay, OsError, OsHooks, OS_TICK_INFINITE};

static PRODUCED: AtomicU32 = AtomicU32::new(0);
static DROPPED: AtomicU32 = AtomicU32::new(0);

static QUEUE: Queue = Queue::new();

extern "C" fn producer_task(_arg: *mut ()) -> ! {
    loop {
        let n = PRODUCED.fetch_add(1, Ordering::Relaxed) + 1;
        match QUEUE.send(&n.to_le_bytes()) {
            Ok(()) => info!("[P] produced #{}", n),
            Err(OsError::OperationFailed) => {
                let d = DROPPED.fetch_add(1, Ordering::Relaxed) + 1;
                info!("[P] queue full, dropped {} so far", d);
            }
            Err(e) => info!("[P] send failed: {}", e),
        }
        let _ = os_task_delay(100);
    }
}

extern "C" fn consumer_task(_arg: *mut ()) -> ! {
    let mut buf = [0u8; 4];
    loop {
        match QUEUE.receive(&mut buf, OS_TICK_INFINITE) {
            Ok(()) => info!("[C] consumed #{}", u32::from_le_bytes(buf)),
            Err(e) => info!("[C] receive failed: {}", e),
        }
        // Slower than the producer, so the queue fills up over time
        let _ = os_task_delay(150);
    }
}

#[entry]
fn main() -> ! {
    info!("Producer-Consumer Demo");

    if let Err(e) = edurtos::os_init(OsHooks::DEFAULT) {
        defmt::panic!("OS init failed: {}", e);
    }
    if let Err(e) = QUEUE.init(core::mem::size_of::<u32>()) {
        defmt::panic!("queue init failed: {}", e);
    }

    let _ = os_task_create(producer_task, "P", 2, core::ptr::null_mut());
    let _ = os_task_create(consumer_task, "C", 3, core::ptr::null_mut());

    info!("Starting...");
    let _ = edurtos::os_start_scheduler();

    loop { cortex_m::asm::wfi(); }
}
