//! Initial register frame for a new task
//!
//! This is the only place that knows the Cortex-M exception frame layout.
//! A primed stack looks exactly like the stack of a task that was suspended
//! by PendSV: the software-saved block (R4-R11 and EXC_RETURN) sits below the
//! hardware-stacked block (R0-R3, R12, LR, PC, xPSR). The first restore
//! therefore lands on the task entry point with the argument in R0.

use crate::task::OsTaskFn;
use crate::types::OsStkElement;

/// xPSR with only the Thumb bit set
pub const INIT_XPSR: u32 = 1 << 24;

/// Return to thread mode on the main stack, no floating-point state
pub const EXC_RETURN_THREAD_MSP: u32 = 0xFFFF_FFF9;

/// Hook type placed in LR so a returning task lands in a trap
pub type TaskReturnTrap = extern "C" fn() -> !;

/// Register image in ascending address order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub exc_return: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// Words occupied by a full saved context
pub const FRAME_WORDS: usize = core::mem::size_of::<InitialFrame>() / core::mem::size_of::<u32>();

impl InitialFrame {
    /// Frame that starts `entry(arg)` and traps into `on_return` afterwards
    pub fn new(entry: OsTaskFn, arg: *mut (), on_return: TaskReturnTrap) -> Self {
        InitialFrame {
            r4: 0x0404_0404,
            r5: 0x0505_0505,
            r6: 0x0606_0606,
            r7: 0x0707_0707,
            r8: 0x0808_0808,
            r9: 0x0909_0909,
            r10: 0x1010_1010,
            r11: 0x1111_1111,
            exc_return: EXC_RETURN_THREAD_MSP,
            r0: arg as usize as u32,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: on_return as usize as u32,
            // Exception return wants a halfword-aligned PC, Thumb lives in xPSR
            pc: (entry as usize as u32) & !1,
            xpsr: INIT_XPSR,
        }
    }

    pub fn to_words(&self) -> [u32; FRAME_WORDS] {
        [
            self.r4, self.r5, self.r6, self.r7, self.r8, self.r9, self.r10, self.r11,
            self.exc_return, self.r0, self.r1, self.r2, self.r3, self.r12, self.lr,
            self.pc, self.xpsr,
        ]
    }

    /// Decode the frame stored at the top of `stack`
    pub fn read_top(stack: &[OsStkElement]) -> Self {
        let w = &stack[stack.len() - FRAME_WORDS..];
        InitialFrame {
            r4: w[0],
            r5: w[1],
            r6: w[2],
            r7: w[3],
            r8: w[4],
            r9: w[5],
            r10: w[6],
            r11: w[7],
            exc_return: w[8],
            r0: w[9],
            r1: w[10],
            r2: w[11],
            r3: w[12],
            r12: w[13],
            lr: w[14],
            pc: w[15],
            xpsr: w[16],
        }
    }
}

/// Write the initial frame at the high end of `stack`
///
/// Returns the stack pointer to hand to the first context restore, which
/// is the top of the stack minus [`FRAME_WORDS`]. The caller guarantees
/// `stack.len() >= FRAME_WORDS`.
pub fn prime_stack(
    stack: &mut [OsStkElement],
    entry: OsTaskFn,
    arg: *mut (),
    on_return: TaskReturnTrap,
) -> *mut OsStkElement {
    let base = stack.len() - FRAME_WORDS;
    let frame = InitialFrame::new(entry, arg, on_return);
    stack[base..].copy_from_slice(&frame.to_words());
    stack[base..].as_mut_ptr()
}
