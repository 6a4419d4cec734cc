//! Port layer - CPU-specific implementations
//!
//! This module provides the hardware abstraction layer for context switching,
//! the tick timer and the interrupt controller.

pub mod frame;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

// Host implementations so kernel logic can be tested off-target
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use portable_atomic::{AtomicBool, AtomicU32, Ordering};

    use crate::config::CFG_IRQ_MAX;
    use crate::irq::Irq;

    static PEND_REQUESTS: AtomicU32 = AtomicU32::new(0);
    static IRQ_ENABLED: [AtomicBool; CFG_IRQ_MAX] = [const { AtomicBool::new(false) }; CFG_IRQ_MAX];

    pub fn os_cpu_init() {}

    pub fn os_cpu_systick_init(_cnts: u32) {}

    /// Counts requests instead of raising PendSV
    pub fn request_context_switch() {
        PEND_REQUESTS.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of switch requests seen so far
    pub fn pend_requests() -> u32 {
        PEND_REQUESTS.load(Ordering::Relaxed)
    }

    pub fn wait_for_interrupt() {
        core::hint::spin_loop();
    }

    pub fn irq_enable(irq: Irq) {
        IRQ_ENABLED[irq.index()].store(true, Ordering::Relaxed);
    }

    pub fn irq_disable(irq: Irq) {
        IRQ_ENABLED[irq.index()].store(false, Ordering::Relaxed);
    }

    pub fn irq_clear_pending(_irq: Irq) {}

    /// Whether the line is unmasked at the (simulated) controller
    pub fn irq_is_enabled(irq: Irq) -> bool {
        IRQ_ENABLED[irq.index()].load(Ordering::Relaxed)
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
