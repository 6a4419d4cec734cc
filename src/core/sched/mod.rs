//! Scheduler module
//!
//! Priority-based preemptive scheduling with round-robin among equal
//! priorities. [`Kernel::decide`] only names the next task and marks a
//! switch as pending; the switch itself happens later in the exchange half
//! ([`Kernel::switch_context`]) run by the switch exception.

mod switch;

use crate::kernel::Kernel;
use crate::types::{OsPrio, OsState, OsTaskState, TaskRef};

/// Outcome of one scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    /// Task that should own the CPU
    pub next: TaskRef,
    /// A switch must be requested
    pub switch: bool,
}

impl Kernel {
    /// Pick the next task to run
    ///
    /// Called from the tick handler, from a voluntary yield and after any
    /// blocking state change. Before the first restore it selects the idle
    /// task. Afterwards it scans the sorted table circularly, starting just
    /// past the current slot:
    ///
    /// - a task is eligible when `READY`, the current task also while it is
    ///   still `RUNNING` (it is visited last)
    /// - the highest priority eligible task wins, ties go to the first one
    ///   met in scan order, which yields round-robin among equals
    /// - a `BLOCKED` current task is never eligible, so it always loses the CPU
    /// - with nothing eligible the idle task is chosen
    pub fn decide(&mut self) -> Decision {
        if self.state == OsState::FromReset {
            self.current = Some(TaskRef::Idle);
            self.next = Some(TaskRef::Idle);
            self.switch_pending = true;
            return Decision { next: TaskRef::Idle, switch: true };
        }

        let current = self.current.unwrap_or(TaskRef::Idle);
        let next = self.select(current);

        self.next = Some(next);
        self.switch_pending = next != current;

        Decision { next, switch: self.switch_pending }
    }

    /// Circular priority search, no side effects
    fn select(&self, current: TaskRef) -> TaskRef {
        let count = self.task_count;
        if count == 0 {
            return TaskRef::Idle;
        }

        let start = match current {
            TaskRef::Task(id) => (id + 1) % count,
            TaskRef::Idle => 0,
        };

        let mut best: Option<(usize, OsPrio)> = None;
        for offset in 0..count {
            let id = (start + offset) % count;
            let tcb = &self.tasks[id];

            let eligible = match tcb.state {
                OsTaskState::Ready => true,
                OsTaskState::Running => current == TaskRef::Task(id),
                OsTaskState::Blocked | OsTaskState::Suspended => false,
            };
            if !eligible {
                continue;
            }

            match best {
                Some((_, prio)) if tcb.prio <= prio => {}
                _ => best = Some((id, tcb.prio)),
            }
        }

        best.map_or(TaskRef::Idle, |(id, _)| TaskRef::Task(id))
    }
}
