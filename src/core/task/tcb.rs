//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task. Stack
//! memory lives in the kernel's stack pool; the TCB keeps the index of its
//! slot there, so reordering TCBs never moves a stack.

use crate::config::CFG_TASK_NAME_LEN;
use crate::types::{OsPrio, OsStkElement, OsTaskState, OsTick};

/// Task stack storage, aligned for the exception frame
#[repr(C, align(8))]
pub struct TaskStack<const N: usize>(pub [OsStkElement; N]);

impl<const N: usize> TaskStack<N> {
    pub const fn new() -> Self {
        TaskStack([0; N])
    }
}

impl<const N: usize> Default for TaskStack<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-length task name
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskName {
    bytes: [u8; CFG_TASK_NAME_LEN],
    len: u8,
}

impl TaskName {
    pub const fn empty() -> Self {
        TaskName { bytes: [0; CFG_TASK_NAME_LEN], len: 0 }
    }

    /// Copy `name`, truncated to the last full character that fits
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(CFG_TASK_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }

        let mut bytes = [0; CFG_TASK_NAME_LEN];
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        TaskName { bytes, len: len as u8 }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

/// Task Control Block
pub struct OsTcb {
    // ============ Stack ============
    /// Saved stack pointer, valid while the task is not running
    pub(crate) stk_ptr: *mut OsStkElement,
    /// Slot in the kernel stack pool
    pub(crate) stk_slot: usize,

    // ============ Identification ============
    pub(crate) name: TaskName,
    /// Identity, equal to the table slot once the table is sorted
    pub(crate) id: usize,

    // ============ Scheduling ============
    pub(crate) prio: OsPrio,
    pub(crate) state: OsTaskState,
    /// Remaining block delay, `OS_TICK_INFINITE` waits for a signal
    pub(crate) ticks_blocked: OsTick,
}

impl OsTcb {
    /// Create a new, unregistered TCB
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_slot: 0,
            name: TaskName::empty(),
            id: 0,
            prio: 0,
            state: OsTaskState::Ready,
            ticks_blocked: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Fill in the registration data and mark the task ready
    pub(crate) fn setup(&mut self, name: &str, prio: OsPrio) {
        self.name = TaskName::new(name);
        self.prio = prio;
        self.state = OsTaskState::Ready;
        self.ticks_blocked = 0;
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn prio(&self) -> OsPrio {
        self.prio
    }

    #[inline]
    pub fn state(&self) -> OsTaskState {
        self.state
    }

    #[inline]
    pub fn ticks_blocked(&self) -> OsTick {
        self.ticks_blocked
    }

    #[inline]
    pub fn stack_ptr(&self) -> *mut OsStkElement {
        self.stk_ptr
    }

    #[inline]
    pub fn stack_slot(&self) -> usize {
        self.stk_slot
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == OsTaskState::Ready
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.state == OsTaskState::Blocked
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
