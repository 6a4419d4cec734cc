//! Task management module
//!
//! Registration into the fixed task table, the one-time priority sort that
//! the scheduler's circular search depends on, and the task-return trap.

mod tcb;

pub use tcb::{OsTcb, TaskName, TaskStack};

use core::panic::Location;

use crate::config::{CFG_IDLE_STK_SIZE_WORDS, CFG_STK_SIZE_WORDS, CFG_TASKS_MAX};
use crate::error::{OsError, OsResult};
use crate::kernel::{Kernel, KERNEL};
use crate::port::frame::{prime_stack, FRAME_WORDS};
use crate::types::{OsPrio, OsTaskState};

/// Task entry point function type
pub type OsTaskFn = extern "C" fn(*mut ()) -> !;

const _: () = assert!(CFG_STK_SIZE_WORDS >= FRAME_WORDS);
const _: () = assert!(CFG_IDLE_STK_SIZE_WORDS >= FRAME_WORDS);

impl Kernel {
    /// Register a task in the next free slot
    ///
    /// The stack is primed so the first restore enters `entry(arg)`. The
    /// identity is the registration ordinal until the table is sorted.
    ///
    /// # Returns
    /// * `Ok(id)` - Slot of the new task
    /// * `Err(OsError::CapacityExceeded)` - Table full, reported to the error hook
    /// * `Err(OsError::AlreadyRunning)` - The scheduler already started
    /// * `Err(OsError::NotInitialized)` - `init` was not called
    #[track_caller]
    pub fn create_task(
        &mut self,
        entry: OsTaskFn,
        name: &str,
        prio: OsPrio,
        arg: *mut (),
    ) -> OsResult<usize> {
        let res = self.register(entry, name, prio, arg);
        if let Err(OsError::CapacityExceeded) = res {
            (self.hooks.error)(OsError::CapacityExceeded, Location::caller());
        }
        res
    }

    /// Table insertion; a full table is left for the caller to report
    fn register(&mut self, entry: OsTaskFn, name: &str, prio: OsPrio, arg: *mut ()) -> OsResult<usize> {
        if !self.initialized {
            return Err(OsError::NotInitialized);
        }
        if self.started {
            return Err(OsError::AlreadyRunning);
        }
        if self.task_count >= CFG_TASKS_MAX {
            crate::error!("task table full, '{}' rejected", name);
            return Err(OsError::CapacityExceeded);
        }

        let id = self.task_count;
        let sp = prime_stack(&mut self.stacks[id].0, entry, arg, os_task_return);

        let tcb = &mut self.tasks[id];
        tcb.reset();
        tcb.setup(name, prio);
        tcb.stk_slot = id;
        tcb.stk_ptr = sp;
        tcb.id = id;

        self.task_count += 1;
        crate::debug!("task '{}' registered, prio {}, id {}", name, prio, id);
        Ok(id)
    }

    /// Stable sort by descending priority, then renumber identities
    ///
    /// Equal priorities keep their registration order. Stacks stay where
    /// they are; only TCBs move.
    pub fn sort_by_priority(&mut self) {
        let tasks = &mut self.tasks[..self.task_count];

        // Insertion sort: stable, in place, and the table is tiny
        for i in 1..tasks.len() {
            let mut j = i;
            while j > 0 && runs_before(&tasks[j], &tasks[j - 1]) {
                tasks.swap(j, j - 1);
                j -= 1;
            }
        }

        for (id, tcb) in tasks.iter_mut().enumerate() {
            tcb.id = id;
        }
    }

    /// Remove a task from the table
    ///
    /// Tasks live for the lifetime of the firmware; removal is not supported.
    pub fn delete_task(&mut self, _id: usize) -> OsResult<()> {
        Err(OsError::NotImplemented)
    }
}

/// Scheduling order comparator: strictly higher priority goes first
#[inline]
fn runs_before(a: &OsTcb, b: &OsTcb) -> bool {
    a.prio > b.prio
}

/// Trap installed as LR of every task; a task function must never return
pub(crate) extern "C" fn os_task_return() -> ! {
    let hook = unsafe { KERNEL.get_unchecked().hooks.task_return };
    hook()
}

// ============ Public API ============

/// Register a task before the scheduler starts
///
/// # Example
/// ```ignore
/// extern "C" fn blink(_: *mut ()) -> ! {
///     loop {
///         let _ = edurtos::os_task_delay(500);
///     }
/// }
///
/// edurtos::os_init(edurtos::OsHooks::DEFAULT)?;
/// edurtos::os_task_create(blink, "Blink", 2, core::ptr::null_mut())?;
/// edurtos::os_start_scheduler()?;
/// ```
///
/// A full table is reported to the error hook after the kernel is released,
/// so the hook may call back into the `os_*` API.
#[track_caller]
pub fn os_task_create(entry: OsTaskFn, name: &str, prio: OsPrio, arg: *mut ()) -> OsResult<usize> {
    let caller = Location::caller();
    let (res, hook) = KERNEL.with(|k| (k.register(entry, name, prio, arg), k.hooks.error));
    if let Err(OsError::CapacityExceeded) = res {
        hook(OsError::CapacityExceeded, caller);
    }
    res
}

/// Always fails with `NotImplemented`
pub fn os_task_delete(id: usize) -> OsResult<()> {
    KERNEL.with(|k| k.delete_task(id))
}

/// State of a registered task
pub fn os_task_state(id: usize) -> Option<OsTaskState> {
    KERNEL.with(|k| k.task(id).map(|t| t.state()))
}
