//! Shell end-to-end test.
//!
//! Scripts a complete interactive session into the keyboard injection
//! queue, boots the shell task plus a judge task, and hands control to the
//! task system. The judge polls the framebuffer until the shell has
//! consumed the whole script, then checks the transcript, the `ps`
//! listing, and the heartbeat overlay, and exits QEMU with the verdict.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(coros_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use coros_kernel::arch::interrupts;
use coros_kernel::arch::qemu::{exit_qemu, QemuExitCode};
use coros_kernel::debugln;
use coros_kernel::drivers::keyboard;
use coros_kernel::drivers::screen::with_screen;
use coros_kernel::scheduler;
use coros_kernel::shell;

const VGA_BUFFER: usize = 0xB8000;
const VGA_COLS: usize = 80;

const ENTER: u8 = 0x1C;

#[no_mangle]
pub extern "C" fn kmain() -> ! {
    coros_kernel::drivers::serial::init();
    interrupts::disable();
    test_main();

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    coros_kernel::testing::test_panic_handler(info)
}

fn vga_char(row: usize, col: usize) -> u8 {
    let cell = VGA_BUFFER + (row * VGA_COLS + col) * 2;
    // SAFETY:
    // - `cell` addresses a visible VGA text cell; volatile read for MMIO.
    unsafe { core::ptr::read_volatile(cell as *const u8) }
}

fn row_starts_with(row: usize, text: &str) -> bool {
    text.bytes().enumerate().all(|(i, b)| vga_char(row, i) == b)
}

fn text_at(row: usize, col: usize, text: &str) -> bool {
    text.bytes().enumerate().all(|(i, b)| vga_char(row, col + i) == b)
}

/// Make code for the characters used in the script.
fn scancode_for(c: u8) -> u8 {
    match c {
        b'a' => 0x1E,
        b'b' => 0x30,
        b'h' => 0x23,
        b'k' => 0x25,
        b'n' => 0x31,
        b'p' => 0x19,
        b's' => 0x1F,
        b't' => 0x14,
        b'w' => 0x11,
        b'0' => 0x0B,
        b' ' => 0x39,
        _ => panic!("no scancode mapping for byte {}", c),
    }
}

fn type_line(line: &str) {
    for c in line.bytes() {
        assert!(keyboard::enqueue_scancode(scancode_for(c)), "script must fit the queue");
    }
    assert!(keyboard::enqueue_scancode(ENTER));
}

fn judge_task() {
    // The shell owns slot 0 and runs first, so by the time this task gets
    // polling it usually has the whole transcript already. Wait for the
    // fourth prompt (the one after `ps`) to be safe.
    let mut settled = false;
    for _ in 0..2000 {
        scheduler::yield_now();
        if row_starts_with(9, "> ") {
            settled = true;
            break;
        }
    }
    assert!(settled, "shell did not finish the scripted session");

    // Transcript of the session, row by row.
    assert!(row_starts_with(0, "> thanks"));
    assert!(row_starts_with(1, "You're welcome!"));
    assert!(row_starts_with(2, "> spawn hb0"));
    assert!(row_starts_with(3, "Spawned hb0."));
    assert!(row_starts_with(4, "> ps"));
    assert!(row_starts_with(5, "ID STATE NAME"));
    assert!(row_starts_with(6, "0  *     shell"), "shell prints itself RUNNING");
    assert!(row_starts_with(7, "1  R     judge"));
    assert!(row_starts_with(8, "2  R     heartbeat0"));

    // The spawned heartbeat claimed overlay row 0 as instance 0.
    assert!(text_at(0, 60, "HB0 #2 : "), "heartbeat must stamp its overlay row");
    let digit = vga_char(0, 69);
    assert!(digit.is_ascii_digit(), "heartbeat counter digit must be rendered");

    // The HUD lists the live tasks bottom-right.
    assert!(text_at(19, 54, "Tasks"));
    assert!(text_at(20, 54, "#0") && text_at(20, 59, "shell"));
    assert!(text_at(21, 54, "#1") && text_at(21, 59, "judge"));
    assert!(text_at(22, 54, "#2") && text_at(22, 59, "heartbeat0"));

    debugln!("shell_e2e: all checks passed");
    exit_qemu(QemuExitCode::Success);
}

/// Contract: a scripted `thanks` / `spawn hb0` / `ps` session produces the
/// specified transcript, overlay, and HUD.
///
/// Control never returns here; the judge task exits QEMU directly.
#[test_case]
fn test_scripted_shell_session() {
    keyboard::init();
    scheduler::init();
    with_screen(|s| s.clear());

    type_line("thanks");
    type_line("spawn hb0");
    type_line("ps");

    let shell = scheduler::task_create(shell::shell_task, "shell").expect("spawn shell");
    let judge = scheduler::task_create(judge_task, "judge").expect("spawn judge");
    assert!((shell, judge) == (0, 1));

    scheduler::schedule();

    panic!("bootstrap context resumed after one-way switch");
}
