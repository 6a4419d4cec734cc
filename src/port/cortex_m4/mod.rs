//! Cortex-M4 port implementation
//!
//! Tasks run in thread mode on the main stack (EXC_RETURN 0xFFFFFFF9). The
//! switch is performed by PendSV, configured at the lowest priority so it
//! only runs once every other handler has drained.

use core::arch::naked_asm;

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{NVIC, SCB};

use crate::irq::Irq;
use crate::kernel::KERNEL;

unsafe impl InterruptNumber for Irq {
    #[inline]
    fn number(self) -> u16 {
        self.raw()
    }
}

/// Put PendSV at the lowest priority, SysTick just above it
pub fn os_cpu_init() {
    let mut scb = unsafe { cortex_m::Peripherals::steal() }.SCB;
    unsafe {
        scb.set_priority(SystemHandler::PendSV, 0xFF);
        scb.set_priority(SystemHandler::SysTick, 0xE0);
    }
}

/// Initialize SysTick timer for system tick generation
///
/// # Arguments
/// * `cnts` - Reload value
///
/// # Example
/// For 16MHz clock with 1000Hz tick rate: cnts = 16_000_000 / 1000 = 16_000
pub fn os_cpu_systick_init(cnts: u32) {
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(cnts - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Pend the switch exception
///
/// The barriers make sure the pend is visible and the pipeline refetched
/// before the caller goes on, so a yielding task is suspended right here.
#[inline(always)]
pub fn request_context_switch() {
    SCB::set_pendsv();
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

#[inline(always)]
pub fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}

pub fn irq_enable(irq: Irq) {
    unsafe { NVIC::unmask(irq) };
}

pub fn irq_disable(irq: Irq) {
    NVIC::mask(irq);
}

pub fn irq_clear_pending(irq: Irq) {
    NVIC::unpend(irq);
}

/// Exchange half of the switch, called from PendSV with the suspended sp
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn os_switch_context(cur_sp: *mut u32) -> *mut u32 {
    // PendSV cannot re-enter and runs with interrupts masked
    unsafe { KERNEL.get_unchecked().switch_context(cur_sp) }
}

/// PendSV exception handler - performs the context switch
///
/// 1. Push R4-R11 and EXC_RETURN below the hardware frame
/// 2. Hand the resulting sp to the kernel, get the next task's sp back
/// 3. Pop R4-R11 and EXC_RETURN from the new stack
/// 4. Exception return unstacks the rest
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "push {{r4-r11, lr}}",
        "mrs r0, msp",
        // 8-byte AAPCS alignment for the call, the stack is discarded anyway
        "sub sp, sp, #4",
        "bl {switch}",
        "msr msp, r0",
        "pop {{r4-r11, lr}}",
        "cpsie i",
        "dsb",
        "isb",
        "bx lr",
        switch = sym os_switch_context,
    );
}

/// SysTick interrupt handler
#[no_mangle]
pub extern "C" fn SysTick() {
    crate::time::os_tick_handler();
}
