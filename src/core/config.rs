//! Compile-time configuration for the kernel
//!
//! These constants control the resource limits of the kernel. Everything is
//! statically allocated from them.

use crate::types::{OsPrio, OsTick};

/// Maximum number of application tasks (the idle task is extra)
pub const CFG_TASKS_MAX: usize = 8;

/// Application task stack size in words (256 bytes)
pub const CFG_STK_SIZE_WORDS: usize = 64;

/// Idle task stack size in words
pub const CFG_IDLE_STK_SIZE_WORDS: usize = 64;

/// Maximum stored task name length in bytes
pub const CFG_TASK_NAME_LEN: usize = 16;

/// Byte capacity of every queue buffer
pub const CFG_QUEUE_SIZE_BYTES: usize = 64;

/// Number of peripheral interrupt lines covered by the dispatch table
pub const CFG_IRQ_MAX: usize = 64;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Core clock feeding SysTick
pub const CFG_CPU_CLOCK_HZ: u32 = 16_000_000;

/// Idle task priority. Higher numbers are more urgent, so idle is 0.
pub const CFG_PRIO_IDLE: OsPrio = 0;

/// Delay sentinel: the task is only woken by a give/send
pub const OS_TICK_INFINITE: OsTick = OsTick::MAX;
