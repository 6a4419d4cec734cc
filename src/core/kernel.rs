//! Kernel control block and global entry points
//!
//! [`Kernel`] is the one mutable aggregate the whole system shares: the task
//! table, the idle task, the current/next task references, the pending
//! switch flag, the run state and the tick counter. The scheduler, the tick
//! handler, the task table and the context switch extend it from their own
//! modules. The firmware uses a single instance, [`KERNEL`], through the
//! `os_*` functions below; tests drive private instances directly.

use crate::config::{CFG_CPU_CLOCK_HZ, CFG_IDLE_STK_SIZE_WORDS, CFG_PRIO_IDLE, CFG_STK_SIZE_WORDS, CFG_TASKS_MAX, CFG_TICK_RATE_HZ};
use crate::core::cs_cell::CsCell;
use crate::critical::{is_isr_context, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::hooks::OsHooks;
use crate::port;
use crate::task::{os_task_return, OsTcb, TaskStack};
use crate::types::{OsState, OsTaskState, OsTick, TaskRef};

// ============ Kernel Control Block ============

/// Kernel control block
pub struct Kernel {
    pub(crate) tasks: [OsTcb; CFG_TASKS_MAX],
    pub(crate) stacks: [TaskStack<CFG_STK_SIZE_WORDS>; CFG_TASKS_MAX],
    pub(crate) idle: OsTcb,
    pub(crate) idle_stack: TaskStack<CFG_IDLE_STK_SIZE_WORDS>,
    pub(crate) task_count: usize,
    pub(crate) current: Option<TaskRef>,
    pub(crate) next: Option<TaskRef>,
    pub(crate) switch_pending: bool,
    pub(crate) state: OsState,
    pub(crate) initialized: bool,
    pub(crate) started: bool,
    pub(crate) tick_counter: OsTick,
    pub(crate) hooks: OsHooks,
}

unsafe impl Send for Kernel {}

impl Kernel {
    pub const fn new() -> Self {
        Kernel {
            tasks: [const { OsTcb::new() }; CFG_TASKS_MAX],
            stacks: [const { TaskStack::new() }; CFG_TASKS_MAX],
            idle: OsTcb::new(),
            idle_stack: TaskStack::new(),
            task_count: 0,
            current: None,
            next: None,
            switch_pending: false,
            state: OsState::FromReset,
            initialized: false,
            started: false,
            tick_counter: 0,
            hooks: OsHooks::DEFAULT,
        }
    }

    /// Reset all state and prime the idle task
    ///
    /// The kernel must not move afterwards: saved stack pointers point into
    /// its own stack storage.
    pub fn init(&mut self, hooks: OsHooks) {
        for tcb in self.tasks.iter_mut() {
            tcb.reset();
        }
        self.task_count = 0;
        self.current = None;
        self.next = None;
        self.switch_pending = false;
        self.state = OsState::FromReset;
        self.started = false;
        self.tick_counter = 0;
        self.hooks = hooks;

        self.idle.reset();
        self.idle.setup("Idle", CFG_PRIO_IDLE);
        self.idle.stk_ptr = port::frame::prime_stack(
            &mut self.idle_stack.0,
            os_idle_task,
            core::ptr::null_mut(),
            os_task_return,
        );

        self.initialized = true;
    }

    /// Sort the table and make the first scheduling decision
    ///
    /// After this returns, [`switch_pending`](Self::switch_pending) is set
    /// and the first context restore brings up the idle task.
    ///
    /// # Returns
    /// * `Err(OsError::NotInitialized)` - `init` was never called
    /// * `Err(OsError::AlreadyRunning)` - Already started
    pub fn start(&mut self) -> OsResult<()> {
        if !self.initialized {
            return Err(OsError::NotInitialized);
        }
        if self.started {
            return Err(OsError::AlreadyRunning);
        }

        self.sort_by_priority();
        self.started = true;
        self.decide();
        Ok(())
    }

    // ============ Accessors ============

    #[inline]
    pub fn is_running(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn state(&self) -> OsState {
        self.state
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Registered task by identity
    #[inline]
    pub fn task(&self, id: usize) -> Option<&OsTcb> {
        self.tasks[..self.task_count].get(id)
    }

    #[inline]
    pub fn idle_task(&self) -> &OsTcb {
        &self.idle
    }

    /// TCB behind a task reference, `None` for an unregistered slot
    #[inline]
    pub fn tcb(&self, task: TaskRef) -> Option<&OsTcb> {
        match task {
            TaskRef::Idle => Some(&self.idle),
            TaskRef::Task(id) => self.task(id),
        }
    }

    #[inline]
    pub(crate) fn try_tcb_mut(&mut self, task: TaskRef) -> Option<&mut OsTcb> {
        match task {
            TaskRef::Idle => Some(&mut self.idle),
            TaskRef::Task(id) => self.tasks[..self.task_count].get_mut(id),
        }
    }

    /// Only for references the kernel produced itself (`current`, `next`)
    #[inline]
    pub(crate) fn tcb_mut(&mut self, task: TaskRef) -> &mut OsTcb {
        match task {
            TaskRef::Idle => &mut self.idle,
            TaskRef::Task(id) => &mut self.tasks[id],
        }
    }

    #[inline]
    pub fn current(&self) -> Option<TaskRef> {
        self.current
    }

    #[inline]
    pub fn next(&self) -> Option<TaskRef> {
        self.next
    }

    /// A switch was decided and the exchange half has not run yet
    #[inline]
    pub fn switch_pending(&self) -> bool {
        self.switch_pending
    }

    #[inline]
    pub fn hooks(&self) -> &OsHooks {
        &self.hooks
    }

    /// Number of tasks in `RUNNING` state, idle included
    pub fn running_count(&self) -> usize {
        self.tasks[..self.task_count]
            .iter()
            .chain(core::iter::once(&self.idle))
            .filter(|t| t.state == OsTaskState::Running)
            .count()
    }

    // ============ IRQ run state ============

    /// Switch to `IrqRun`, returning the state to restore
    pub(crate) fn enter_irq(&mut self) -> OsState {
        let prev = self.state;
        self.state = OsState::IrqRun;
        prev
    }

    pub(crate) fn exit_irq(&mut self, prev: OsState) {
        self.state = prev;
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Global Instance ============

/// The firmware's kernel instance
pub(crate) static KERNEL: CsCell<Kernel> = CsCell::new(Kernel::new());

/// Idle task entry
extern "C" fn os_idle_task(_: *mut ()) -> ! {
    let idle = unsafe { KERNEL.get_unchecked().hooks.idle };
    idle()
}

/// Fail unless the caller may suspend
pub(crate) fn check_may_block() -> OsResult<()> {
    if is_isr_context() || CriticalSection::is_active() {
        return Err(OsError::OperationFailed);
    }
    Ok(())
}

// ============ Public API ============

/// Initialize the kernel
///
/// Must be called before any other kernel function. Resets the task table,
/// primes the idle task and sets the switch exception to the lowest
/// priority.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(OsError::AlreadyRunning)` - The scheduler is already running
pub fn os_init(hooks: OsHooks) -> OsResult<()> {
    KERNEL.with(|k| {
        if k.is_running() {
            return Err(OsError::AlreadyRunning);
        }
        k.init(hooks);
        Ok(())
    })?;

    port::os_cpu_init();
    crate::info!("kernel initialized");
    Ok(())
}

/// Start multitasking
///
/// Sorts the task table by priority, starts the tick timer and requests the
/// first context restore. On target the switch happens before this returns,
/// so the call never comes back.
///
/// # Returns
/// * `Err(OsError::NotInitialized)` - `os_init` was not called
/// * `Err(OsError::AlreadyRunning)` - Already started
pub fn os_start_scheduler() -> OsResult<()> {
    let pend = KERNEL.with(|k| {
        k.start()?;
        crate::info!("starting scheduler with {} tasks", k.task_count());
        Ok(k.switch_pending())
    })?;

    port::os_cpu_systick_init(CFG_CPU_CLOCK_HZ / CFG_TICK_RATE_HZ);

    if pend {
        port::request_context_switch();
    }
    Ok(())
}

/// Give up the CPU
///
/// Runs the scheduling decision and requests a switch if another task
/// should run. Returns once the caller is scheduled again.
///
/// # Returns
/// * `Err(OsError::NotRunning)` - The scheduler was not started
pub fn os_yield() -> OsResult<()> {
    let pend = KERNEL.with(|k| {
        if !k.is_running() {
            return Err(OsError::NotRunning);
        }
        Ok(k.decide().switch)
    })?;

    if pend {
        port::request_context_switch();
    }
    Ok(())
}

/// Currently running task, `None` before the first switch
pub fn os_current_task() -> Option<TaskRef> {
    KERNEL.with(|k| k.current())
}

/// Kernel run state
pub fn os_kernel_state() -> OsState {
    KERNEL.with(|k| k.state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::frame::{InitialFrame, FRAME_WORDS};

    #[test]
    fn test_init_primes_idle() {
        let mut k = Kernel::new();
        k.init(OsHooks::DEFAULT);

        let idle = k.idle_task();
        assert_eq!(idle.state(), OsTaskState::Ready);
        assert_eq!(idle.prio(), CFG_PRIO_IDLE);
        assert_eq!(idle.name(), "Idle");

        let top = k.idle_stack.0.as_ptr() as usize + CFG_IDLE_STK_SIZE_WORDS * 4;
        assert_eq!(idle.stk_ptr as usize, top - FRAME_WORDS * 4);

        let frame = InitialFrame::read_top(&k.idle_stack.0);
        assert_eq!(frame.pc, (os_idle_task as usize as u32) & !1);
        assert_eq!(frame.lr, os_task_return as usize as u32);
    }

    #[test]
    fn test_start_requires_init() {
        let mut k = Kernel::new();
        assert_eq!(k.start(), Err(OsError::NotInitialized));
    }

    #[test]
    fn test_start_twice_fails() {
        let mut k = Kernel::new();
        k.init(OsHooks::DEFAULT);
        assert_eq!(k.start(), Ok(()));
        assert_eq!(k.start(), Err(OsError::AlreadyRunning));
    }

    #[test]
    fn test_irq_state_round_trip() {
        let mut k = Kernel::new();
        k.init(OsHooks::DEFAULT);
        let prev = k.enter_irq();
        assert_eq!(prev, OsState::FromReset);
        assert_eq!(k.state(), OsState::IrqRun);
        k.exit_irq(prev);
        assert_eq!(k.state(), OsState::FromReset);
    }
}
