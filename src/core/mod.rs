//! Core kernel modules
//!
//! Contains the kernel control block, scheduler, task table, time base,
//! critical sections and the IRQ dispatch table.

pub mod config;
pub mod critical;
pub mod error;
pub mod hooks;
pub mod irq;
pub mod kernel;
pub mod types;
pub mod task;
pub mod sched;
pub mod time;
pub mod cs_cell;
