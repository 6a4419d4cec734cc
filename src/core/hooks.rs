//! Application hooks
//!
//! The kernel calls out to the application at four points. Each one is a
//! plain function pointer handed to [`os_init`](crate::kernel::os_init), so
//! the integrating firmware decides whether a fatal condition halts, resets
//! or logs and carries on.

use core::panic::Location;

use crate::error::OsError;
use crate::types::OsTick;

/// Hook invoked when a task entry function returns
pub type TaskReturnHook = fn() -> !;

/// Body of the idle task
pub type IdleHook = fn() -> !;

/// Hook invoked at the end of every tick
pub type TickHook = fn(OsTick);

/// Hook invoked for non-recoverable errors, with the failing caller's location
pub type ErrorHook = fn(OsError, &'static Location<'static>);

/// Set of application hooks
#[derive(Clone, Copy)]
pub struct OsHooks {
    pub task_return: TaskReturnHook,
    pub idle: IdleHook,
    pub tick: TickHook,
    pub error: ErrorHook,
}

impl OsHooks {
    /// Conservative defaults: fatal paths halt, idle sleeps
    pub const DEFAULT: OsHooks = OsHooks {
        task_return: default_task_return,
        idle: default_idle,
        tick: default_tick,
        error: default_error,
    };
}

impl Default for OsHooks {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

fn default_task_return() -> ! {
    crate::error!("task function returned");
    halt()
}

fn default_idle() -> ! {
    loop {
        crate::port::wait_for_interrupt();
    }
}

fn default_tick(_tick: OsTick) {}

fn default_error(_err: OsError, _caller: &'static Location<'static>) {
    crate::error!("fatal {} at {}:{}", _err, _caller.file(), _caller.line());
    halt()
}
