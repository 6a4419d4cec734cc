//! Core type definitions for the kernel

/// Task priority (higher value = more urgent, idle is lowest)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Stack element type
pub type OsStkElement = u32;

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    /// Task can be picked by the scheduler
    Ready = 0,
    /// Task owns the CPU
    Running = 1,
    /// Task waits for a delay to expire or for a give/send
    Blocked = 2,
    /// Task is parked and never scheduled
    Suspended = 3,
}

/// Kernel run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsState {
    /// No context has been restored yet
    FromReset = 0,
    /// A task is running in thread mode
    NormalRun = 1,
    /// A dispatched peripheral handler is running
    IrqRun = 2,
}

/// Identity of a schedulable unit
///
/// `Task(i)` is the slot in the priority-sorted table, which is also the
/// task identity once the scheduler has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskRef {
    Idle,
    Task(usize),
}

impl TaskRef {
    /// Table slot, `None` for the idle task
    #[inline]
    pub fn slot(self) -> Option<usize> {
        match self {
            TaskRef::Idle => None,
            TaskRef::Task(id) => Some(id),
        }
    }

    #[inline]
    pub fn is_idle(self) -> bool {
        self == TaskRef::Idle
    }
}
