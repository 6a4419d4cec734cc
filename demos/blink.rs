//! Blink Example - LED blinking using RTOS on STM32F401

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use cortex_m_semihosting::hprintln;
use edurtos::{os_delay_ms, os_task_create, OsHooks};

use edurtos::pac;

// ============ LED Control ============

fn led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpioaen(true));
    pac::GPIOA.moder().modify(|w| w.set_moder(5, pac::gpio::vals::Moder::OUTPUT));
    pac::GPIOA.otyper().modify(|w| w.set_ot(5, pac::gpio::vals::Ot::PUSHPULL));
}

fn led_on() { pac::GPIOA.bsrr().write(|w| w.set_bs(5, true)); }

fn led_off() { pac::GPIOA.bsrr().write(|w| w.set_br(5, true)); }

// ============ Tasks ============

extern "C" fn blink_task(_: *mut ()) -> ! {
    edurtos::info!("Blink task started");
    loop {
        led_on();
        let _ = os_delay_ms(500);

        led_off();
        let _ = os_delay_ms(500);
    }
}

extern "C" fn heartbeat_task(_: *mut ()) -> ! {
    loop {
        edurtos::info!("tick {}", edurtos::os_get_tick_counter());
        let _ = os_delay_ms(1000);
    }
}

// ============ Main ============

#[entry]
fn main() -> ! {
    led_init();

    if edurtos::os_init(OsHooks::DEFAULT).is_err() {
        hprintln!("OS init failed");
        loop { cortex_m::asm::nop(); }
    }

    let created = os_task_create(blink_task, "Blink", 5, core::ptr::null_mut())
        .and_then(|_| os_task_create(heartbeat_task, "Heartbeat", 2, core::ptr::null_mut()));
    if created.is_err() {
        hprintln!("task creation failed");
    }

    hprintln!("Starting RTOS");
    let _ = edurtos::os_start_scheduler();

    loop { cortex_m::asm::nop(); }
}
