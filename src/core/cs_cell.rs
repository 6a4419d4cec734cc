//! Critical section protected cell
//!
//! Holds the kernel's shared mutable state. Safe access requires a
//! [`CriticalSection`] token; exception handlers that the hardware already
//! serialises use the unchecked accessor.

use core::cell::UnsafeCell;
use crate::critical::{critical_section, CriticalSection};

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Mutable access proven by a live critical section
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn get<'cs>(&'cs self, _cs: &'cs CriticalSection) -> &'cs mut T {
        unsafe { &mut *self.0.get() }
    }

    /// Run `f` on the contents inside a fresh critical section
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(self.get(cs)))
    }

    /// Mutable access without a guard
    ///
    /// # Safety
    /// The caller must be the only context touching the contents, e.g. the
    /// PendSV handler with interrupts masked.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_unchecked(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}
