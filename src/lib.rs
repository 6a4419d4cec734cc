//! A small preemptive real-time kernel for single-core ARM Cortex-M
//!
//! The kernel provides:
//! - A fixed table of statically allocated tasks, sorted once by priority
//! - Priority-based preemptive scheduling with round-robin among equals
//! - Tick-driven delays and a deferred (PendSV) context switch
//! - Binary semaphores and bounded byte queues
//! - An IRQ dispatch table that routes peripheral vectors to user handlers

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;

// ============ Re-exports ============

pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::critical;
pub use crate::core::critical::{os_enter_critical, os_exit_critical};
pub use crate::core::error;
pub use crate::core::error::{OsError, OsResult};
pub use crate::core::hooks;
pub use crate::core::hooks::OsHooks;
pub use crate::core::irq;
pub use crate::core::irq::{os_install_irq, os_uninstall_irq, Irq};
pub use crate::core::kernel;
pub use crate::core::kernel::{os_init, os_start_scheduler, os_yield, Kernel};
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::task;
pub use crate::core::task::{os_task_create, os_task_delete, OsTaskFn};
pub use crate::core::sched;
pub use crate::core::time;
pub use crate::core::time::{os_delay_ms, os_get_tick_counter, os_task_delay};

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "sem")]
pub use sync::sem::Semaphore;
#[cfg(feature = "queue")]
pub use sync::queue;
#[cfg(feature = "queue")]
pub use sync::queue::Queue;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
