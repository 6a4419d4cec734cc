//! IRQ dispatch table
//!
//! Peripheral vectors all funnel into [`os_irq_dispatch`], which looks up
//! the handler installed for the line and runs it with the kernel in
//! `IrqRun` state. Vector entries are generated with [`os_irq_vector!`].

use crate::config::CFG_IRQ_MAX;
use crate::core::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::kernel::KERNEL;
use crate::port;

/// Peripheral interrupt line number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq(u16);

impl Irq {
    pub const fn new(number: u16) -> Self {
        Irq(number)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interrupt service routine, called with the argument given at install
pub type IsrFn = fn(*mut ());

/// An installed handler and its argument
#[derive(Clone, Copy)]
pub struct IrqHandler {
    pub handler: IsrFn,
    pub arg: *mut (),
}

/// Fixed mapping from interrupt line to handler
pub struct IrqTable {
    slots: [Option<IrqHandler>; CFG_IRQ_MAX],
}

unsafe impl Send for IrqTable {}

impl IrqTable {
    pub const fn new() -> Self {
        IrqTable { slots: [None; CFG_IRQ_MAX] }
    }

    /// Record `handler` for `irq`
    ///
    /// A different handler or argument replaces the current one.
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - Line outside the table
    /// * `Err(OsError::OperationFailed)` - The same handler and argument are already installed
    pub fn install(&mut self, irq: Irq, handler: IsrFn, arg: *mut ()) -> OsResult<()> {
        let slot = self.slots.get_mut(irq.index()).ok_or(OsError::InvalidArgument)?;

        if let Some(cur) = slot {
            if cur.handler as usize == handler as usize && cur.arg == arg {
                return Err(OsError::OperationFailed);
            }
        }

        *slot = Some(IrqHandler { handler, arg });
        Ok(())
    }

    /// Clear the slot for `irq`
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - Line outside the table
    /// * `Err(OsError::OperationFailed)` - Nothing installed
    pub fn uninstall(&mut self, irq: Irq) -> OsResult<()> {
        let slot = self.slots.get_mut(irq.index()).ok_or(OsError::InvalidArgument)?;
        slot.take().map(|_| ()).ok_or(OsError::OperationFailed)
    }

    #[inline]
    pub fn get(&self, irq: Irq) -> Option<IrqHandler> {
        self.slots.get(irq.index()).copied().flatten()
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

static IRQ_TABLE: CsCell<IrqTable> = CsCell::new(IrqTable::new());

// ============ Public API ============

/// Install `handler` for `irq` and enable the line
///
/// The table update happens with interrupts masked, so the line cannot fire
/// against a half-written slot.
pub fn os_install_irq(irq: Irq, handler: IsrFn, arg: *mut ()) -> OsResult<()> {
    IRQ_TABLE.with(|t| t.install(irq, handler, arg))?;

    port::irq_clear_pending(irq);
    port::irq_enable(irq);
    crate::debug!("irq {} installed", irq.raw());
    Ok(())
}

/// Remove the handler for `irq` and disable the line
pub fn os_uninstall_irq(irq: Irq) -> OsResult<()> {
    IRQ_TABLE.with(|t| t.uninstall(irq))?;

    port::irq_disable(irq);
    port::irq_clear_pending(irq);
    crate::debug!("irq {} uninstalled", irq.raw());
    Ok(())
}

/// Handler currently installed for `irq`
pub fn os_irq_handler(irq: Irq) -> Option<IrqHandler> {
    IRQ_TABLE.with(|t| t.get(irq))
}

/// Common trampoline for every peripheral vector
///
/// Runs the installed handler with the kernel in `IrqRun`, restores the
/// previous run state and clears the line's pending flag. A line with no
/// handler is ignored.
pub fn os_irq_dispatch(irq: Irq) {
    let entry = IRQ_TABLE.with(|t| t.get(irq));

    match entry {
        Some(IrqHandler { handler, arg }) => {
            let prev = KERNEL.with(|k| k.enter_irq());
            handler(arg);
            KERNEL.with(|k| k.exit_irq(prev));
        }
        None => {
            crate::warn!("unhandled irq {}", irq.raw());
        }
    }

    port::irq_clear_pending(irq);
}

/// Define a vector-table entry that forwards to [`os_irq_dispatch`]
///
/// ```ignore
/// edurtos::os_irq_vector!(EXTI0, 6);
/// ```
#[macro_export]
macro_rules! os_irq_vector {
    ($name:ident, $irq:expr) => {
        #[no_mangle]
        pub extern "C" fn $name() {
            $crate::irq::os_irq_dispatch($crate::irq::Irq::new($irq));
        }
    };
}
