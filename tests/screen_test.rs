//! Screen/VGA driver integration tests.
//!
//! Every test drives a fresh `Screen` against the real VGA text buffer and
//! verifies the result with volatile readbacks.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(coros_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use coros_kernel::drivers::screen::{Screen, TEXT_AREA_HEIGHT, VGA_HEIGHT, VGA_WIDTH};

const VGA_BUFFER: usize = 0xB8000;

#[no_mangle]
pub extern "C" fn kmain() -> ! {
    coros_kernel::drivers::serial::init();
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
    let cell = VGA_BUFFER + (row * VGA_WIDTH + col) * 2;
    // SAFETY:
    // - `cell` addresses a visible VGA text cell; volatile read for MMIO.
    unsafe { core::ptr::read_volatile(cell as *const u8) }
}

fn vga_attribute(row: usize, col: usize) -> u8 {
    let cell = VGA_BUFFER + (row * VGA_WIDTH + col) * 2 + 1;
    // SAFETY:
    // - `cell` addresses the attribute byte of a visible VGA text cell.
    unsafe { core::ptr::read_volatile(cell as *const u8) }
}

/// Contract: clear blanks the whole grid with the default attribute and
/// homes the cursor.
#[test_case]
fn test_clear_blanks_grid_and_homes_cursor() {
    let mut screen = Screen::new();
    screen.set_cursor(12, 40);
    screen.clear();

    assert!(screen.cursor_position() == (0, 0), "clear must home the cursor");
    assert!(vga_char(0, 0) == b' ', "top-left cell must be blank");
    assert!(vga_char(VGA_HEIGHT - 1, VGA_WIDTH - 1) == b' ', "bottom-right cell must be blank");
    assert!(vga_attribute(0, 0) == 0x0F, "default palette must be white on black");
}

/// Contract: print_char writes at the cursor and advances the column.
#[test_case]
fn test_print_char_writes_and_advances() {
    let mut screen = Screen::new();
    screen.clear();

    screen.print_char(b'A');
    screen.print_char(b'B');

    assert!(vga_char(0, 0) == b'A');
    assert!(vga_char(0, 1) == b'B');
    assert!(screen.cursor_position() == (0, 2), "cursor must advance past both characters");
}

/// Contract: newline space-fills the remainder of the current line.
/// Given: stale characters to the right of the cursor on the same row.
/// When: a newline is printed.
/// Then: those cells are blanked and the cursor moves to column 0 of the
/// next row.
#[test_case]
fn test_newline_space_fills_rest_of_line() {
    let mut screen = Screen::new();
    screen.clear();

    screen.print_str("AB");
    screen.put_char_at(0, 50, b'X');
    screen.print_char(b'\n');

    assert!(vga_char(0, 0) == b'A', "written prefix must survive the newline");
    assert!(vga_char(0, 50) == b' ', "stale cell right of the cursor must be blanked");
    assert!(screen.cursor_position() == (1, 0));
}

/// Contract: reaching the right edge behaves as a newline.
#[test_case]
fn test_wrap_at_right_edge_behaves_as_newline() {
    let mut screen = Screen::new();
    screen.clear();

    screen.set_cursor(5, VGA_WIDTH - 1);
    screen.print_char(b'Q');

    assert!(vga_char(5, VGA_WIDTH - 1) == b'Q', "last-column character must land before the wrap");
    assert!(screen.cursor_position() == (6, 0), "wrap must continue at column 0 of the next row");
}

/// Contract: newline at the last text-area row scrolls and spares the
/// reserved bottom row.
/// Given: content on rows 22 and 23 and a marker on the reserved row 24.
/// When: a newline is printed from the last text-area row.
/// Then: rows move up by one, the last text-area row is blank, the cursor
/// stays at (23, 0), and row 24 is untouched.
#[test_case]
fn test_newline_at_bottom_scrolls_text_area_only() {
    let mut screen = Screen::new();
    screen.clear();
    screen.put_char_at(VGA_HEIGHT - 1, 0, b'M');

    screen.set_cursor(22, 0);
    screen.print_char(b'A');
    screen.set_cursor(23, 0);
    screen.print_char(b'Z');
    screen.print_char(b'\n');

    assert!(vga_char(21, 0) == b'A', "row 22 content must move up to row 21");
    assert!(vga_char(22, 0) == b'Z', "row 23 content must move up to row 22");
    assert!(vga_char(23, 0) == b' ', "last text-area row must be blanked by the scroll");
    assert!(vga_char(VGA_HEIGHT - 1, 0) == b'M', "reserved bottom row must not scroll");
    assert!(
        screen.cursor_position() == (TEXT_AREA_HEIGHT - 1, 0),
        "cursor must end at column 0 of the last text-area row"
    );
}

/// Contract: out-of-bounds absolute writes are a no-op and absolute writes
/// never move the logical cursor.
#[test_case]
fn test_put_char_at_bounds_and_cursor_independence() {
    let mut screen = Screen::new();
    screen.clear();
    screen.set_cursor(3, 3);

    screen.put_char_at(VGA_HEIGHT, 0, b'x');
    screen.put_char_at(0, VGA_WIDTH, b'x');
    screen.put_char_at(10, 10, b'x');

    assert!(vga_char(10, 10) == b'x', "in-bounds absolute write must land");
    assert!(screen.cursor_position() == (3, 3), "absolute writes must not move the cursor");
}

/// Contract: write_at stops at the end of the row.
#[test_case]
fn test_write_at_stops_at_end_of_row() {
    let mut screen = Screen::new();
    screen.clear();

    screen.write_at(2, VGA_WIDTH - 2, "WXYZ");

    assert!(vga_char(2, VGA_WIDTH - 2) == b'W');
    assert!(vga_char(2, VGA_WIDTH - 1) == b'X');
    assert!(vga_char(3, 0) == b' ', "write_at must not spill onto the next row");
}

/// Contract: scrolling the full text area restores every row to spaces.
#[test_case]
fn test_repeated_scroll_restores_rows_to_spaces() {
    let mut screen = Screen::new();
    screen.clear();

    for col in 0..VGA_WIDTH {
        screen.put_char_at(0, col, b'X');
    }

    screen.set_cursor(TEXT_AREA_HEIGHT - 1, 0);
    for _ in 0..TEXT_AREA_HEIGHT {
        screen.print_char(b'\n');
    }

    for row in 0..TEXT_AREA_HEIGHT {
        for col in 0..VGA_WIDTH {
            assert!(
                vga_char(row, col) == b' ',
                "text area must be fully blank after scrolling it through"
            );
        }
    }
}

/// Contract: clear_text_area spares the reserved bottom row.
#[test_case]
fn test_clear_text_area_spares_bottom_row() {
    let mut screen = Screen::new();
    screen.clear();
    screen.put_char_at(VGA_HEIGHT - 1, 5, b'M');
    screen.set_cursor(4, 4);
    screen.print_str("junk");

    screen.clear_text_area();

    assert!(vga_char(4, 4) == b' ', "text area content must be cleared");
    assert!(vga_char(VGA_HEIGHT - 1, 5) == b'M', "reserved row must keep its contents");
    assert!(screen.cursor_position() == (0, 0));
}
