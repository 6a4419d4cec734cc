//! Critical section handling
//!
//! Nestable global interrupt masking. The outermost exit re-enables
//! interrupts, inner exits only unwind the nesting counter.

use portable_atomic::{AtomicU32, Ordering};

use crate::error::{OsError, OsResult};

/// Nesting counter shared by the guard and the explicit enter/exit API
pub struct CriticalNesting {
    depth: AtomicU32,
}

impl CriticalNesting {
    pub const fn new() -> Self {
        Self { depth: AtomicU32::new(0) }
    }

    /// Record one more level. Returns the new depth.
    #[inline(always)]
    pub fn enter(&self) -> u32 {
        self.depth.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Unwind one level. Returns the remaining depth.
    ///
    /// Fails without touching the counter when nothing was entered.
    #[inline(always)]
    pub fn exit(&self) -> OsResult<u32> {
        let depth = self.depth.load(Ordering::Acquire);
        if depth == 0 {
            return Err(OsError::OperationFailed);
        }
        self.depth.store(depth - 1, Ordering::Release);
        Ok(depth - 1)
    }

    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Acquire)
    }
}

impl Default for CriticalNesting {
    fn default() -> Self {
        Self::new()
    }
}

/// Global nesting counter
static NESTING: CriticalNesting = CriticalNesting::new();

#[inline(always)]
fn irq_disable() {
    #[cfg(target_arch = "arm")]
    cortex_m::interrupt::disable();
}

#[inline(always)]
fn irq_enable() {
    #[cfg(target_arch = "arm")]
    unsafe { cortex_m::interrupt::enable() };
}

/// RAII guard for critical sections
///
/// Creating the guard disables interrupts. Dropping the outermost guard
/// enables them again.
pub struct CriticalSection {
    _private: (),
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    #[inline(always)]
    pub fn enter() -> Self {
        irq_disable();
        NESTING.enter();
        CriticalSection { _private: () }
    }

    /// Check if we're currently in a critical section
    #[inline(always)]
    pub fn is_active() -> bool {
        NESTING.depth() > 0
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        if let Ok(0) = NESTING.exit() {
            irq_enable();
        }
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Disable interrupts and bump the nesting counter
pub fn os_enter_critical() -> OsResult<()> {
    irq_disable();
    NESTING.enter();
    Ok(())
}

/// Unwind one nesting level, enabling interrupts at the outermost level
///
/// # Returns
/// * `Ok(())` - Level unwound
/// * `Err(OsError::OperationFailed)` - No matching `os_enter_critical`
pub fn os_exit_critical() -> OsResult<()> {
    if NESTING.exit()? == 0 {
        irq_enable();
    }
    Ok(())
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_counts_levels() {
        let nesting = CriticalNesting::new();
        assert_eq!(nesting.enter(), 1);
        assert_eq!(nesting.enter(), 2);
        assert_eq!(nesting.exit(), Ok(1));
        assert_eq!(nesting.exit(), Ok(0));
    }

    #[test]
    fn test_unbalanced_exit_fails() {
        let nesting = CriticalNesting::new();
        assert_eq!(nesting.exit(), Err(OsError::OperationFailed));
        assert_eq!(nesting.depth(), 0);
    }
}
