//! Time management module
//!
//! Provides the tick timebase, block delays and the deferred wake used by
//! the synchronization primitives.

use portable_atomic::{AtomicU32, Ordering};

use crate::config::{CFG_TICK_RATE_HZ, OS_TICK_INFINITE};
use crate::error::{OsError, OsResult};
use crate::kernel::{check_may_block, Kernel, KERNEL};
use crate::port;
use crate::types::{OsTaskState, OsTick, TaskRef};

impl Kernel {
    /// Advance the timebase by one tick
    ///
    /// Ages every blocked task with a finite delay; a task whose delay
    /// reaches zero becomes `READY` in this same tick. Then runs the
    /// scheduling decision.
    ///
    /// # Returns
    /// `true` when a context switch must be requested
    pub fn tick(&mut self) -> bool {
        self.tick_counter = self.tick_counter.wrapping_add(1);

        for tcb in self.tasks[..self.task_count].iter_mut() {
            if tcb.state != OsTaskState::Blocked || tcb.ticks_blocked == OS_TICK_INFINITE {
                continue;
            }
            if tcb.ticks_blocked > 0 {
                tcb.ticks_blocked -= 1;
            }
            if tcb.ticks_blocked == 0 {
                tcb.state = OsTaskState::Ready;
            }
        }

        self.decide().switch
    }

    #[inline]
    pub fn tick_count(&self) -> OsTick {
        self.tick_counter
    }

    /// Mark the current task `BLOCKED` for `ticks`
    ///
    /// [`OS_TICK_INFINITE`] waits until [`wake`](Self::wake). Does not run the
    /// scheduling decision.
    ///
    /// # Returns
    /// * `Err(OsError::OperationFailed)` - No task is current, or the idle task is
    pub fn block_current(&mut self, ticks: OsTick) -> OsResult<()> {
        match self.current {
            Some(task @ TaskRef::Task(_)) => {
                let tcb = self.tcb_mut(task);
                tcb.state = OsTaskState::Blocked;
                tcb.ticks_blocked = ticks;
                Ok(())
            }
            _ => Err(OsError::OperationFailed),
        }
    }

    /// Block the current task for `ticks` and decide
    ///
    /// A zero delay is a no-op.
    ///
    /// # Returns
    /// `Ok(true)` when a context switch must be requested
    pub fn delay_current(&mut self, ticks: OsTick) -> OsResult<bool> {
        if ticks == 0 {
            return Ok(false);
        }
        self.block_current(ticks)?;
        Ok(self.decide().switch)
    }

    /// Deferred wake
    ///
    /// Clears the remaining delay of a blocked task so the next tick makes it
    /// `READY`. Anything not blocked, or not registered, is left alone.
    pub fn wake(&mut self, task: TaskRef) {
        if let Some(tcb) = self.try_tcb_mut(task) {
            if tcb.state == OsTaskState::Blocked {
                tcb.ticks_blocked = 0;
            }
        }
    }
}

/// Convert milliseconds to ticks, rounding up
///
/// Zero stays zero; any other duration lasts at least one tick.
pub const fn ms_to_ticks(ms: u32) -> OsTick {
    let ticks = (ms as u64 * CFG_TICK_RATE_HZ as u64).div_ceil(1000);
    if ticks >= OS_TICK_INFINITE as u64 {
        OS_TICK_INFINITE - 1
    } else {
        ticks as OsTick
    }
}

// ============ Public API ============

/// Copy of the global tick count readable without the kernel lock
static LOG_TICKS: AtomicU32 = AtomicU32::new(0);

/// Tick count for log timestamps
///
/// Safe to call while the kernel is borrowed, e.g. from a log statement
/// inside a kernel operation.
#[inline]
pub fn log_timestamp() -> OsTick {
    LOG_TICKS.load(Ordering::Relaxed)
}

/// Tick interrupt body
///
/// Does nothing until the scheduler starts. The tick hook runs after the
/// kernel state is updated, outside the critical section.
pub fn os_tick_handler() {
    let ticked = KERNEL.with(|k| {
        if !k.is_running() {
            return None;
        }
        let pend = k.tick();
        Some((pend, k.tick_count(), k.hooks.tick))
    });

    let Some((pend, count, hook)) = ticked else {
        return;
    };
    LOG_TICKS.store(count, Ordering::Relaxed);

    if pend {
        port::request_context_switch();
    }
    hook(count);
}

/// Block the calling task for `ticks` system ticks
///
/// A zero delay returns immediately. The task becomes ready on the tick at
/// which the delay reaches zero.
///
/// # Returns
/// * `Err(OsError::NotRunning)` - The scheduler was not started
/// * `Err(OsError::OperationFailed)` - Called from an interrupt, inside a
///   critical section or from the idle task
pub fn os_task_delay(ticks: OsTick) -> OsResult<()> {
    if !KERNEL.with(|k| k.is_running()) {
        return Err(OsError::NotRunning);
    }
    check_may_block()?;

    if KERNEL.with(|k| k.delay_current(ticks))? {
        port::request_context_switch();
    }
    Ok(())
}

/// Block the calling task for at least `ms` milliseconds
pub fn os_delay_ms(ms: u32) -> OsResult<()> {
    os_task_delay(ms_to_ticks(ms))
}

/// Ticks since the scheduler started
#[inline]
pub fn os_get_tick_counter() -> OsTick {
    KERNEL.with(|k| k.tick_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::OsHooks;

    extern "C" fn noop(_: *mut ()) -> ! {
        loop {}
    }

    /// Kernel with one task, already past the first switch and running it
    fn one_task(k: &mut Kernel) {
        k.init(OsHooks::DEFAULT);
        k.create_task(noop, "A", 2, core::ptr::null_mut()).unwrap();
        k.start().unwrap();
        k.switch_context(core::ptr::null_mut());
        k.decide();
        k.switch_context(core::ptr::null_mut());
        assert_eq!(k.current(), Some(TaskRef::Task(0)));
    }

    #[test]
    fn test_ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1), (CFG_TICK_RATE_HZ as u64).div_ceil(1000) as OsTick);
        assert_eq!(ms_to_ticks(1000), CFG_TICK_RATE_HZ);
    }

    #[test]
    fn test_delay_wakes_on_exact_tick() {
        let mut k = Kernel::new();
        one_task(&mut k);

        assert_eq!(k.delay_current(3), Ok(true));
        k.switch_context(core::ptr::null_mut());

        assert!(!k.tick());
        assert!(!k.tick());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Blocked);
        assert!(k.tick());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Ready);
        assert_eq!(k.tick_count(), 3);
    }

    #[test]
    fn test_zero_delay_is_noop() {
        let mut k = Kernel::new();
        one_task(&mut k);
        assert_eq!(k.delay_current(0), Ok(false));
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Running);
    }

    #[test]
    fn test_infinite_block_never_ages() {
        let mut k = Kernel::new();
        one_task(&mut k);

        k.block_current(OS_TICK_INFINITE).unwrap();
        k.decide();
        k.switch_context(core::ptr::null_mut());

        for _ in 0..100 {
            k.tick();
        }
        let tcb = k.task(0).unwrap();
        assert_eq!(tcb.state(), OsTaskState::Blocked);
        assert_eq!(tcb.ticks_blocked(), OS_TICK_INFINITE);

        k.wake(TaskRef::Task(0));
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Blocked);
        assert!(k.tick());
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Ready);
    }

    #[test]
    fn test_idle_cannot_block() {
        let mut k = Kernel::new();
        k.init(OsHooks::DEFAULT);
        k.start().unwrap();
        k.switch_context(core::ptr::null_mut());
        assert_eq!(k.block_current(5), Err(OsError::OperationFailed));
    }

    #[test]
    fn test_wake_ignores_ready_task() {
        let mut k = Kernel::new();
        one_task(&mut k);
        k.wake(TaskRef::Task(0));
        assert_eq!(k.task(0).unwrap().state(), OsTaskState::Running);
    }

    #[test]
    fn test_wake_unregistered_slot_is_ignored() {
        let mut k = Kernel::new();
        one_task(&mut k);

        k.wake(TaskRef::Task(1));
        k.wake(TaskRef::Task(crate::config::CFG_TASKS_MAX));
        assert!(k.tcb(TaskRef::Task(1)).is_none());
        assert!(k.tcb(TaskRef::Task(crate::config::CFG_TASKS_MAX)).is_none());
        assert_eq!(k.tcb(TaskRef::Task(0)).map(|t| t.state()), Some(OsTaskState::Running));
        assert_eq!(k.tcb(TaskRef::Idle).map(|t| t.name()), Some("Idle"));
    }
}
