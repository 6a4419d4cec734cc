//! Semaphore implementation
//!
//! Binary semaphore with a single waiter. A give never switches tasks by
//! itself: it clears the waiter's delay and the next tick makes it ready.

use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel::{check_may_block, Kernel, KERNEL};
use crate::port;
use crate::types::{OsTick, TaskRef};

const WAIT_FOREVER: OsTick = crate::config::OS_TICK_INFINITE;

/// Semaphore state
///
/// Only one waiter is tracked. A second `take` while one is pending
/// replaces the recorded waiter, and the first is never woken.
#[derive(Debug)]
pub struct OsSem {
    given: bool,
    waiter: Option<TaskRef>,
}

impl OsSem {
    pub const fn new() -> Self {
        OsSem { given: false, waiter: None }
    }

    /// Clear the given flag and the waiter
    pub fn init(&mut self) {
        self.given = false;
        self.waiter = None;
    }

    /// First half of a take, run by the caller's task
    ///
    /// Records the current task as waiter. If the semaphore was not given the
    /// task is blocked without timeout.
    ///
    /// # Returns
    /// * `Ok(true)` - The caller blocked and must request a switch
    /// * `Ok(false)` - Already given, finish right away
    /// * `Err(OsError::OperationFailed)` - No task to block (idle or not started)
    pub fn begin_take(&mut self, k: &mut Kernel) -> OsResult<bool> {
        self.waiter = k.current();

        if self.given {
            return Ok(false);
        }

        if let Err(err) = k.block_current(WAIT_FOREVER) {
            self.waiter = None;
            return Err(err);
        }
        Ok(k.decide().switch)
    }

    /// Second half of a take, after the caller was resumed
    pub fn finish_take(&mut self) {
        self.given = false;
        self.waiter = None;
    }

    /// Set the given flag and wake the waiter, if any
    ///
    /// # Returns
    /// * `Err(OsError::OperationFailed)` - Already given; nothing changes
    pub fn give(&mut self, k: &mut Kernel) -> OsResult<()> {
        if self.given {
            return Err(OsError::OperationFailed);
        }

        self.given = true;
        if let Some(waiter) = self.waiter.take() {
            k.wake(waiter);
        }
        Ok(())
    }

    #[inline(always)]
    pub fn is_given(&self) -> bool {
        self.given
    }

    #[inline(always)]
    pub fn waiter(&self) -> Option<TaskRef> {
        self.waiter
    }
}

impl Default for OsSem {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Safe Wrapper ============

/// Semaphore usable from a `static`
pub struct Semaphore {
    inner: CsCell<OsSem>,
}

impl Semaphore {
    pub const fn new() -> Self {
        Semaphore { inner: CsCell::new(OsSem::new()) }
    }

    pub fn init(&self) {
        self.inner.with(|s| s.init());
    }

    /// Wait until the semaphore is given, then consume it
    ///
    /// Returns immediately when already given. Otherwise the caller blocks
    /// until a give and the following tick.
    ///
    /// # Returns
    /// * `Err(OsError::NotRunning)` - The scheduler was not started
    /// * `Err(OsError::OperationFailed)` - Called from an interrupt, inside a
    ///   critical section or from the idle task
    pub fn take(&self) -> OsResult<()> {
        check_may_block()?;

        let pend = critical_section(|cs| {
            let k = KERNEL.get(cs);
            if !k.is_running() {
                return Err(OsError::NotRunning);
            }
            self.inner.get(cs).begin_take(k)
        })?;

        if pend {
            port::request_context_switch();
        }

        self.inner.with(|s| s.finish_take());
        Ok(())
    }

    /// Give the semaphore; callable from tasks and interrupts
    pub fn give(&self) -> OsResult<()> {
        critical_section(|cs| self.inner.get(cs).give(KERNEL.get(cs)))
    }

    #[inline]
    pub fn is_given(&self) -> bool {
        self.inner.with(|s| s.is_given())
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::OsHooks;
    use crate::types::OsTaskState;

    extern "C" fn noop(_: *mut ()) -> ! {
        loop {}
    }

    fn running(k: &mut Kernel) {
        k.init(OsHooks::DEFAULT);
        k.create_task(noop, "A", 2, core::ptr::null_mut()).unwrap();
        k.start().unwrap();
        k.switch_context(core::ptr::null_mut());
        k.decide();
        k.switch_context(core::ptr::null_mut());
    }

    #[test]
    fn test_take_given_does_not_block() {
        let mut k = Kernel::new();
        running(&mut k);
        let mut sem = OsSem::new();

        sem.give(&mut k).unwrap();
        assert_eq!(sem.begin_take(&mut k), Ok(false));
        sem.finish_take();

        assert!(!sem.is_given());
        assert!(sem.waiter().is_none());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Running);
    }

    #[test]
    fn test_double_give_fails() {
        let mut k = Kernel::new();
        running(&mut k);
        let mut sem = OsSem::new();

        assert_eq!(sem.give(&mut k), Ok(()));
        assert_eq!(sem.give(&mut k), Err(OsError::OperationFailed));
        assert!(sem.is_given());
    }

    #[test]
    fn test_take_blocks_until_give_and_tick() {
        let mut k = Kernel::new();
        running(&mut k);
        let mut sem = OsSem::new();

        assert_eq!(sem.begin_take(&mut k), Ok(true));
        k.switch_context(core::ptr::null_mut());
        assert_eq!(sem.waiter(), Some(TaskRef::Task(0)));

        for _ in 0..10 {
            assert!(!k.tick());
        }

        sem.give(&mut k).unwrap();
        assert!(sem.waiter().is_none());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Blocked);

        assert!(k.tick());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Ready);
    }

    #[test]
    fn test_take_from_idle_fails() {
        let mut k = Kernel::new();
        k.init(OsHooks::DEFAULT);
        k.start().unwrap();
        k.switch_context(core::ptr::null_mut());

        let mut sem = OsSem::new();
        assert_eq!(sem.begin_take(&mut k), Err(OsError::OperationFailed));
        assert!(sem.waiter().is_none());
    }
}
