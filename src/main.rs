//! COROS kernel image.
//!
//! `_start` (Multiboot glue in `arch::boot`) lands here after the boot
//! stack is installed. `kmain` brings up the console and serial port,
//! seeds the task table with the shell and two heartbeats, masks external
//! interrupts, and performs the one-way switch into the first task. The
//! boot stack is never returned to.

#![no_std]
#![no_main]

use core::fmt::Write;
use core::panic::PanicInfo;

use coros_kernel::apps::heartbeat;
use coros_kernel::arch::interrupts;
use coros_kernel::debugln;
use coros_kernel::drivers::screen::{with_screen, Color};
use coros_kernel::drivers::serial;
use coros_kernel::scheduler;
use coros_kernel::shell;

#[no_mangle]
pub extern "C" fn kmain() -> ! {
    serial::init();
    debugln!("coros: boot");

    with_screen(|s| {
        s.clear();
        s.set_color(Color::LightGreen);
        s.print_str("COROS - cooperative multitasking kernel\n");
        s.set_color(Color::White);
        s.print_str("Commands: thanks, clear, ps, spawn hb0, spawn hb1, kill <id>, yield, exit\n\n");

        s.cursor_hide();
        s.cursor_enable();
        let (row, col) = s.cursor_position();
        s.hw_cursor_set(row, col);

        s.print_str("Kernel starting tasks...\n");
    });

    scheduler::init();

    scheduler::task_create(shell::shell_task, "shell").expect("boot: spawn shell failed");
    scheduler::task_create(heartbeat::heartbeat0_task, heartbeat::HB0_NAME)
        .expect("boot: spawn heartbeat0 failed");
    scheduler::task_create(heartbeat::heartbeat1_task, heartbeat::HB1_NAME)
        .expect("boot: spawn heartbeat1 failed");

    interrupts::disable();
    debugln!("coros: entering scheduler");

    scheduler::schedule();

    // Only reachable if the table were empty: nothing to run, sleep forever.
    loop {
        // SAFETY:
        // - `hlt` with interrupts masked parks the CPU; valid in ring 0.
        unsafe {
            core::arch::asm!("hlt");
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    interrupts::disable();

    with_screen(|screen| {
        screen.set_colors(Color::White, Color::Blue);
        let _ = write!(screen, "\n!!! KERNEL PANIC !!!\n");

        if let Some(location) = info.location() {
            let _ = write!(screen, "Location: {}:{}\n", location.file(), location.line());
        }
        let _ = write!(screen, "Message: {}\n", info.message());
    });

    debugln!("coros: panic: {}", info.message());

    loop {
        // SAFETY:
        // - Interrupts are masked; `hlt` parks the CPU for good.
        unsafe {
            core::arch::asm!("cli; hlt");
        }
    }
}
