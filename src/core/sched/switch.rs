//! Exchange half of the context switch
//!
//! Runs inside the switch exception, which cannot re-enter, so it needs no
//! locking of its own. It must never be called from task code.

use crate::kernel::Kernel;
use crate::types::{OsState, OsStkElement, OsTaskState, TaskRef};

impl Kernel {
    /// Swap the suspended task's stack pointer for the next task's
    ///
    /// `cur_sp` is the stack pointer of the task being suspended, after its
    /// software-saved registers were pushed. The returned pointer is the one
    /// the CPU restores from. On the very first call `cur_sp` belongs to the
    /// reset context and is discarded.
    pub fn switch_context(&mut self, cur_sp: *mut OsStkElement) -> *mut OsStkElement {
        let next_sp;

        if self.state == OsState::FromReset {
            let current = self.current.unwrap_or(TaskRef::Idle);
            self.current = Some(current);

            let tcb = self.tcb_mut(current);
            tcb.state = OsTaskState::Running;
            next_sp = tcb.stk_ptr;

            self.state = OsState::NormalRun;
        } else {
            let current = self.current.unwrap_or(TaskRef::Idle);
            let next = self.next.unwrap_or(current);

            let old = self.tcb_mut(current);
            old.stk_ptr = cur_sp;
            // A task blocked by a primitive stays blocked
            if old.state == OsTaskState::Running {
                old.state = OsTaskState::Ready;
            }

            let new = self.tcb_mut(next);
            new.state = OsTaskState::Running;
            next_sp = new.stk_ptr;

            self.current = Some(next);
        }

        self.switch_pending = false;
        next_sp
    }
}
