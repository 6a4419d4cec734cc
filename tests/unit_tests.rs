//! Unit tests for the global kernel entry points
//!
//! These tests run on the host (not embedded target) against the port stub.
//! They share the one global kernel, so each test holds `LOCK`.

use std::sync::{Mutex, MutexGuard};

static LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod critical_tests {
    use super::serial;
    use edurtos::critical::{critical_section, CriticalSection};
    use edurtos::{os_enter_critical, os_exit_critical, OsError};

    #[test]
    fn test_nested_enter_exit() {
        let _g = serial();

        assert_eq!(os_enter_critical(), Ok(()));
        assert_eq!(os_enter_critical(), Ok(()));
        assert!(CriticalSection::is_active());

        assert_eq!(os_exit_critical(), Ok(()));
        assert!(CriticalSection::is_active());
        assert_eq!(os_exit_critical(), Ok(()));
        assert!(!CriticalSection::is_active());
    }

    #[test]
    fn test_unbalanced_exit_fails() {
        let _g = serial();
        assert_eq!(os_exit_critical(), Err(OsError::OperationFailed));
        assert!(!CriticalSection::is_active());
    }

    #[test]
    fn test_guard_unwinds_on_drop() {
        let _g = serial();
        let depth = critical_section(|_cs| {
            let _inner = CriticalSection::enter();
            CriticalSection::is_active()
        });
        assert!(depth);
        assert!(!CriticalSection::is_active());
    }
}

#[cfg(test)]
mod irq_tests {
    use super::serial;
    use edurtos::irq::{os_irq_dispatch, os_irq_handler, IsrFn};
    use edurtos::kernel::os_kernel_state;
    use edurtos::port::irq_is_enabled;
    use edurtos::{os_install_irq, os_uninstall_irq, Irq, OsError, OsState};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    static HITS: AtomicU32 = AtomicU32::new(0);
    static SAW_IRQ_RUN: AtomicBool = AtomicBool::new(false);

    fn on_irq(arg: *mut ()) {
        HITS.fetch_add(arg as usize as u32, Ordering::SeqCst);
        SAW_IRQ_RUN.store(os_kernel_state() == OsState::IrqRun, Ordering::SeqCst);
    }

    static OTHER_HITS: AtomicU32 = AtomicU32::new(0);

    fn other(_: *mut ()) {
        OTHER_HITS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_install_dispatch_uninstall() {
        let _g = serial();
        let irq = Irq::new(12);
        let before = os_kernel_state();

        assert_eq!(os_install_irq(irq, on_irq, 3 as *mut ()), Ok(()));
        assert!(irq_is_enabled(irq));
        assert_eq!(os_install_irq(irq, on_irq, 3 as *mut ()), Err(OsError::OperationFailed));

        os_irq_dispatch(irq);
        assert_eq!(HITS.load(Ordering::SeqCst), 3);
        assert!(SAW_IRQ_RUN.load(Ordering::SeqCst));
        assert_eq!(os_kernel_state(), before);

        assert_eq!(os_uninstall_irq(irq), Ok(()));
        assert!(!irq_is_enabled(irq));
        assert!(os_irq_handler(irq).is_none());
        assert_eq!(os_uninstall_irq(irq), Err(OsError::OperationFailed));

        // Unhandled lines are ignored
        os_irq_dispatch(irq);
        assert_eq!(HITS.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_replace_handler() {
        let _g = serial();
        let irq = Irq::new(20);

        os_install_irq(irq, on_irq, core::ptr::null_mut()).unwrap();
        assert_eq!(os_install_irq(irq, other, core::ptr::null_mut()), Ok(()));
        let installed = os_irq_handler(irq).map(|h| h.handler as usize);
        assert_eq!(installed, Some(other as IsrFn as usize));

        os_irq_dispatch(irq);
        assert_eq!(OTHER_HITS.load(Ordering::SeqCst), 1);

        os_uninstall_irq(irq).unwrap();
    }

    #[test]
    fn test_out_of_range_line() {
        let _g = serial();
        let irq = Irq::new(edurtos::CFG_IRQ_MAX as u16);
        assert_eq!(os_install_irq(irq, other, core::ptr::null_mut()), Err(OsError::InvalidArgument));
        assert_eq!(os_uninstall_irq(irq), Err(OsError::InvalidArgument));
    }
}

#[cfg(test)]
mod time_tests {
    use edurtos::time::ms_to_ticks;
    use edurtos::{CFG_TICK_RATE_HZ, OS_TICK_INFINITE};

    #[test]
    fn test_ms_conversion() {
        assert_eq!(ms_to_ticks(0), 0);
        assert!(ms_to_ticks(1) >= 1);
        assert_eq!(ms_to_ticks(500), 500 * CFG_TICK_RATE_HZ / 1000);
        assert!(ms_to_ticks(u32::MAX) < OS_TICK_INFINITE);
    }
}

#[cfg(test)]
mod config_tests {
    use edurtos::config::*;
    use edurtos::port::frame::FRAME_WORDS;

    #[test]
    fn test_config_values() {
        assert!(CFG_TASKS_MAX > 0);
        assert!(CFG_STK_SIZE_WORDS >= FRAME_WORDS);
        assert!(CFG_IDLE_STK_SIZE_WORDS >= FRAME_WORDS);
        assert_eq!(CFG_PRIO_IDLE, 0);
        assert_eq!(FRAME_WORDS, 17);
    }
}

/// Full lifecycle of the global kernel; runs once per process
#[cfg(test)]
mod lifecycle_tests {
    use super::serial;
    use std::panic::Location;
    use edurtos::kernel::{os_current_task, os_kernel_state};
    use edurtos::port::pend_requests;
    use edurtos::task::os_task_state;
    use edurtos::time::os_tick_handler;
    use edurtos::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static ERRORS: AtomicU32 = AtomicU32::new(0);
    static LAST_TICK: AtomicU32 = AtomicU32::new(0);
    static ERROR_LINE: AtomicU32 = AtomicU32::new(0);
    static ERROR_TICK: AtomicU32 = AtomicU32::new(u32::MAX);

    // Calls back into the kernel, so it must run with the kernel released
    fn record_error(err: OsError, caller: &'static Location<'static>) {
        assert_eq!(err, OsError::CapacityExceeded);
        ERRORS.fetch_add(1, Ordering::SeqCst);
        ERROR_LINE.store(caller.line(), Ordering::SeqCst);
        ERROR_TICK.store(os_get_tick_counter(), Ordering::SeqCst);
    }

    fn record_tick(tick: OsTick) {
        LAST_TICK.store(tick, Ordering::SeqCst);
    }

    extern "C" fn worker(_: *mut ()) -> ! {
        loop {
            let _ = os_task_delay(10);
        }
    }

    #[cfg(feature = "sem")]
    static SEM: Semaphore = Semaphore::new();
    #[cfg(feature = "queue")]
    static QUEUE: Queue = Queue::new();

    #[test]
    fn test_kernel_lifecycle() {
        let _g = serial();

        let hooks = OsHooks { error: record_error, tick: record_tick, ..OsHooks::DEFAULT };

        assert_eq!(os_start_scheduler(), Err(OsError::NotInitialized));
        assert_eq!(os_init(hooks), Ok(()));

        // Not started yet
        assert_eq!(os_yield(), Err(OsError::NotRunning));
        assert_eq!(os_task_delay(5), Err(OsError::NotRunning));
        os_tick_handler();
        assert_eq!(os_get_tick_counter(), 0);

        for prio in 0..CFG_TASKS_MAX {
            let id = os_task_create(worker, "worker", prio as OsPrio + 1, std::ptr::null_mut());
            assert_eq!(id, Ok(prio));
        }
        let line = line!() + 1;
        let overflow = os_task_create(worker, "extra", 9, std::ptr::null_mut());
        assert_eq!(overflow, Err(OsError::CapacityExceeded));
        assert_eq!(ERRORS.load(Ordering::SeqCst), 1);
        assert_eq!(ERROR_LINE.load(Ordering::SeqCst), line);
        assert_eq!(ERROR_TICK.load(Ordering::SeqCst), 0);

        assert_eq!(os_task_delete(0), Err(OsError::NotImplemented));

        let pends = pend_requests();
        assert_eq!(os_start_scheduler(), Ok(()));
        assert!(pend_requests() > pends);
        assert_eq!(os_kernel_state(), OsState::FromReset);
        assert_eq!(os_current_task(), Some(TaskRef::Idle));

        // Sorted: the highest priority sits in slot 0
        assert_eq!(os_task_state(0), Some(OsTaskState::Ready));
        assert_eq!(os_task_state(CFG_TASKS_MAX), None);

        assert_eq!(os_start_scheduler(), Err(OsError::AlreadyRunning));
        assert_eq!(os_init(OsHooks::DEFAULT), Err(OsError::AlreadyRunning));
        assert_eq!(
            os_task_create(worker, "late", 1, std::ptr::null_mut()),
            Err(OsError::AlreadyRunning)
        );

        os_tick_handler();
        assert_eq!(os_get_tick_counter(), 1);
        assert_eq!(LAST_TICK.load(Ordering::SeqCst), 1);

        #[cfg(feature = "sem")]
        {
            SEM.init();
            assert_eq!(SEM.give(), Ok(()));
            assert_eq!(SEM.give(), Err(OsError::OperationFailed));
            assert!(SEM.is_given());
            assert_eq!(SEM.take(), Ok(()));
            assert!(!SEM.is_given());
            // Idle is current, it may not block
            assert_eq!(SEM.take(), Err(OsError::OperationFailed));
        }

        #[cfg(feature = "queue")]
        {
            assert_eq!(QUEUE.init(4), Ok(()));
            assert_eq!(QUEUE.capacity(), CFG_QUEUE_SIZE_BYTES / 4);
            assert_eq!(QUEUE.send(&[1, 2, 3, 4]), Ok(()));
            assert_eq!(QUEUE.len(), 1);

            let mut out = [0u8; 4];
            assert_eq!(QUEUE.receive(&mut out, 0), Ok(()));
            assert_eq!(out, [1, 2, 3, 4]);
            assert_eq!(QUEUE.receive(&mut out, 0), Err(OsError::QueueEmpty));
            assert!(QUEUE.is_empty());

            // A waiting receive inside a critical section is refused
            os_enter_critical().unwrap();
            assert_eq!(QUEUE.receive(&mut out, 10), Err(OsError::OperationFailed));
            os_exit_critical().unwrap();
        }
    }
}
