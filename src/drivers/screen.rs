//! VGA Text Mode Driver
//!
//! Owns the character-cell framebuffer at physical address 0xB8000
//! (80 x 25 cells, low byte character, high byte attribute) and the CRTC
//! hardware cursor. The logical cursor lives in the *text area*, the top
//! 24 rows; the bottom row is reserved for status output and is never
//! touched by scrolling. Absolute writes (`put_char_at` / `write_at`) may
//! address the whole grid and leave the logical cursor alone; overlay and
//! HUD rendering is built entirely on them.

use crate::arch::port::PortByte;
use core::cell::UnsafeCell;
use core::fmt;
use core::ptr;

/// VGA text buffer base address (identity-mapped low memory)
const VGA_BUFFER: usize = 0xB8000;

/// VGA CRTC ports for cursor control
const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA: u16 = 0x3D5;

/// CRTC register indices
const CURSOR_START_REG: u8 = 0x0A;
const CURSOR_END_REG: u8 = 0x0B;
const CURSOR_POS_HIGH_REG: u8 = 0x0E;
const CURSOR_POS_LOW_REG: u8 = 0x0F;

/// Writing this to the cursor-start register turns the cursor off
const CURSOR_DISABLE: u8 = 0x20;

/// Block cursor covering the full scanline range of a cell
const CURSOR_SCANLINE_START: u8 = 0;
const CURSOR_SCANLINE_END: u8 = 15;

/// Screen dimensions
pub const VGA_WIDTH: usize = 80;
pub const VGA_HEIGHT: usize = 25;

/// Rows managed by the logical cursor; the bottom row never scrolls.
pub const TEXT_AREA_HEIGHT: usize = VGA_HEIGHT - 1;

/// VGA Colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// One VGA character cell (character + attribute byte)
#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct VgaChar {
    character: u8,
    attribute: u8,
}

/// Screen driver state: logical text-area cursor plus the active palette.
pub struct Screen {
    row: usize,
    col: usize,
    foreground: Color,
    background: Color,
}

impl Screen {
    pub const fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            foreground: Color::White,
            background: Color::Black,
        }
    }

    /// Attribute byte for new cells
    fn attribute(&self) -> u8 {
        ((self.background as u8) << 4) | (self.foreground as u8)
    }

    fn cell_ptr(&self, row: usize, col: usize) -> *mut VgaChar {
        (VGA_BUFFER + (row * VGA_WIDTH + col) * 2) as *mut VgaChar
    }

    fn write_cell(&self, row: usize, col: usize, character: u8) {
        let cell = VgaChar {
            character,
            attribute: self.attribute(),
        };
        // SAFETY:
        // - `row`/`col` are kept within the 80x25 grid by all callers.
        // - Volatile access is required for MMIO semantics.
        unsafe {
            ptr::write_volatile(self.cell_ptr(row, col), cell);
        }
    }

    /// Set the current text color
    pub fn set_color(&mut self, color: Color) {
        self.foreground = color;
    }

    /// Set both foreground and background colors
    pub fn set_colors(&mut self, foreground: Color, background: Color) {
        self.foreground = foreground;
        self.background = background;
    }

    /// Clear the whole grid and reset the cursor to (0, 0).
    pub fn clear(&mut self) {
        for row in 0..VGA_HEIGHT {
            self.clear_row(row);
        }
        self.row = 0;
        self.col = 0;
        self.hw_cursor_update();
    }

    /// Clear the text area only and reset the cursor to (0, 0).
    ///
    /// The reserved bottom row keeps its contents.
    pub fn clear_text_area(&mut self) {
        for row in 0..TEXT_AREA_HEIGHT {
            self.clear_row(row);
        }
        self.row = 0;
        self.col = 0;
        self.hw_cursor_update();
    }

    fn clear_row(&self, row: usize) {
        for col in 0..VGA_WIDTH {
            self.write_cell(row, col, b' ');
        }
    }

    /// Print a single character at the logical cursor.
    ///
    /// Newline advances to the next text-area line (scrolling at the
    /// bottom); hitting the right edge behaves like a newline.
    pub fn print_char(&mut self, c: u8) {
        if c == b'\n' {
            self.newline();
            return;
        }

        self.write_cell(self.row, self.col, c);
        self.col += 1;
        if self.col >= VGA_WIDTH {
            self.newline();
            return;
        }
        self.hw_cursor_update();
    }

    /// Print a string at the logical cursor.
    pub fn print_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.print_char(byte);
        }
    }

    /// Absolute write; no cursor or scroll side effect.
    ///
    /// Out-of-bounds coordinates are a no-op.
    pub fn put_char_at(&self, row: usize, col: usize, c: u8) {
        if row >= VGA_HEIGHT || col >= VGA_WIDTH {
            return;
        }
        self.write_cell(row, col, c);
    }

    /// Absolute string write starting at `(row, col)`; stops at the end of
    /// the row.
    pub fn write_at(&self, row: usize, col: usize, s: &str) {
        for (i, byte) in s.bytes().enumerate() {
            if col + i >= VGA_WIDTH {
                break;
            }
            self.put_char_at(row, col + i, byte);
        }
    }

    /// Line feed with the text-area scroll rule: space-fill the rest of the
    /// current line, then either move down or scroll the text area up.
    fn newline(&mut self) {
        while self.col < VGA_WIDTH {
            self.write_cell(self.row, self.col, b' ');
            self.col += 1;
        }
        self.col = 0;

        if self.row + 1 >= TEXT_AREA_HEIGHT {
            self.scroll_up();
            self.row = TEXT_AREA_HEIGHT - 1;
        } else {
            self.row += 1;
        }
        self.hw_cursor_update();
    }

    /// Move text-area rows [1, TEXT_AREA_HEIGHT) up by one and blank the
    /// last text-area row. The reserved bottom row is not part of the copy.
    fn scroll_up(&mut self) {
        let count = (TEXT_AREA_HEIGHT - 1) * VGA_WIDTH;
        // SAFETY:
        // - Source and destination both lie inside the text area of the
        //   VGA buffer; the regions overlap, which `ptr::copy` permits.
        unsafe {
            ptr::copy(self.cell_ptr(1, 0), self.cell_ptr(0, 0), count);
        }
        self.clear_row(TEXT_AREA_HEIGHT - 1);
    }

    /// Get the logical cursor position (0-based)
    pub fn cursor_position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Set the logical cursor position (0-based, clamped to the grid)
    pub fn set_cursor(&mut self, row: usize, col: usize) {
        self.row = row.min(VGA_HEIGHT - 1);
        self.col = col.min(VGA_WIDTH - 1);
        self.hw_cursor_update();
    }

    fn hw_cursor_update(&self) {
        self.hw_cursor_set(self.row, self.col);
    }

    /// Program the hardware cursor position, independent of the logical
    /// cursor. Coordinates are clamped to the grid.
    pub fn hw_cursor_set(&self, row: usize, col: usize) {
        let row = row.min(VGA_HEIGHT - 1);
        let col = col.min(VGA_WIDTH - 1);
        let pos = (row * VGA_WIDTH + col) as u16;

        // SAFETY:
        // - CRTC index/data writes only move the visible cursor.
        unsafe {
            let index = PortByte::new(CRTC_INDEX);
            let data = PortByte::new(CRTC_DATA);

            index.write(CURSOR_POS_LOW_REG);
            data.write(pos as u8);
            index.write(CURSOR_POS_HIGH_REG);
            data.write((pos >> 8) as u8);
        }
    }

    /// Enable the hardware cursor with a full-cell scanline range.
    pub fn cursor_enable(&self) {
        // SAFETY:
        // - Read-modify-write of the CRTC cursor shape registers keeps the
        //   reserved upper bits intact.
        unsafe {
            let index = PortByte::new(CRTC_INDEX);
            let data = PortByte::new(CRTC_DATA);

            index.write(CURSOR_START_REG);
            let start = data.read();
            data.write((start & 0xC0) | CURSOR_SCANLINE_START);

            index.write(CURSOR_END_REG);
            let end = data.read();
            data.write((end & 0xE0) | CURSOR_SCANLINE_END);
        }
    }

    /// Hide the hardware cursor.
    pub fn cursor_hide(&self) {
        // SAFETY:
        // - Setting the disable bit in the cursor-start register only
        //   affects cursor visibility.
        unsafe {
            let index = PortByte::new(CRTC_INDEX);
            let data = PortByte::new(CRTC_DATA);

            index.write(CURSOR_START_REG);
            data.write(CURSOR_DISABLE);
        }
    }
}

// write!() support for shell output
impl fmt::Write for Screen {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print_str(s);
        Ok(())
    }
}

/// Global console instance shared by every task.
struct Console {
    inner: UnsafeCell<Screen>,
}

// SAFETY:
// - Kernel is single-core and cooperative; exactly one task runs at a time
//   and `with_screen` closures contain no yield point.
unsafe impl Sync for Console {}

static CONSOLE: Console = Console {
    inner: UnsafeCell::new(Screen::new()),
};

/// Run `f` with the shared screen.
///
/// The closure must not yield: the scheduler would hand the mutable screen
/// state to another task mid-update.
pub fn with_screen<R>(f: impl FnOnce(&mut Screen) -> R) -> R {
    // SAFETY:
    // - Single thread of control; no reentrancy because no interrupts and
    //   no yield inside the closure.
    unsafe { f(&mut *CONSOLE.inner.get()) }
}
