//! Synchronization primitives
//!
//! Contains binary semaphores and message queues.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "queue")]
pub mod queue;
