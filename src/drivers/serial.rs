//! Serial Port Driver for Debug Output
//!
//! COM1 (0x3F8) at 115200 8N1, transmit only. When running under QEMU,
//! pass `-serial stdio` or `-serial file:debug.log` to capture the output
//! on the host. This is the kernel's only logging channel; the `debug!` /
//! `debugln!` macros below are no-ops until `init` runs.

use crate::arch::port::PortByte;
use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

/// Standard COM1 base port address
const COM1_PORT: u16 = 0x3F8;

/// Register offsets from the base port
const DATA_REGISTER: u16 = 0;
const INTERRUPT_ENABLE: u16 = 1;
const FIFO_CONTROL: u16 = 2;
const LINE_CONTROL: u16 = 3;
const MODEM_CONTROL: u16 = 4;
const LINE_STATUS: u16 = 5;

/// Line status bit: transmitter holding register empty
const LINE_STATUS_THRE: u8 = 0x20;

/// Serial port driver for debug output
pub struct Serial {
    base_port: u16,
}

impl Serial {
    pub const fn new() -> Self {
        Self {
            base_port: COM1_PORT,
        }
    }

    fn register(&self, offset: u16) -> PortByte {
        PortByte::new(self.base_port + offset)
    }

    /// Configure 115200 baud, 8 data bits, no parity, 1 stop bit.
    pub fn init(&self) {
        // SAFETY:
        // - Standard 16550 bring-up sequence against COM1 registers only.
        unsafe {
            // Interrupts off; this driver polls.
            self.register(INTERRUPT_ENABLE).write(0x00);

            // DLAB on, divisor 1 (= 115200 baud), then 8N1 with DLAB off.
            self.register(LINE_CONTROL).write(0x80);
            self.register(DATA_REGISTER).write(0x01);
            self.register(INTERRUPT_ENABLE).write(0x00);
            self.register(LINE_CONTROL).write(0x03);

            // FIFO on and cleared, 14-byte threshold.
            self.register(FIFO_CONTROL).write(0xC7);

            // RTS/DSR set.
            self.register(MODEM_CONTROL).write(0x0B);
        }
    }

    fn is_transmit_empty(&self) -> bool {
        // SAFETY:
        // - Line status reads have no side effect on the 16550.
        unsafe { (self.register(LINE_STATUS).read() & LINE_STATUS_THRE) != 0 }
    }

    /// Write a single byte, waiting for the transmitter to drain first.
    pub fn write_byte(&self, byte: u8) {
        while !self.is_transmit_empty() {
            core::hint::spin_loop();
        }

        // SAFETY:
        // - Data register write transmits one byte.
        unsafe {
            self.register(DATA_REGISTER).write(byte);
        }
    }

    /// Write a string, converting LF to CRLF for host-side log files.
    pub fn write_str(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Serial::write_str(self, s);
        Ok(())
    }
}

/// Global serial port instance for debug output
struct DebugSerial {
    serial: UnsafeCell<Serial>,
    initialized: AtomicBool,
}

// SAFETY:
// - Serial access is single-threaded in this kernel (no SMP, no IRQs);
//   the atomic flag only gates output before `init`.
unsafe impl Sync for DebugSerial {}

static DEBUG_SERIAL: DebugSerial = DebugSerial {
    serial: UnsafeCell::new(Serial::new()),
    initialized: AtomicBool::new(false),
};

/// Initialize the debug serial port. Call early in boot.
pub fn init() {
    // SAFETY:
    // - Single-threaded boot path; nothing else touches the port yet.
    unsafe {
        (*DEBUG_SERIAL.serial.get()).init();
    }
    DEBUG_SERIAL.initialized.store(true, Ordering::Release);
}

/// Formatted output backend for the `debug!` macro.
#[doc(hidden)]
pub fn _debug_print(args: fmt::Arguments) {
    use fmt::Write;
    if DEBUG_SERIAL.initialized.load(Ordering::Acquire) {
        // SAFETY:
        // - Single thread of control; see `DebugSerial`.
        unsafe {
            let _ = (*DEBUG_SERIAL.serial.get()).write_fmt(args);
        }
    }
}

/// Debug output macro - works like print! but targets the serial port
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::drivers::serial::_debug_print(format_args!($($arg)*))
    };
}

/// Debug output macro with newline
#[macro_export]
macro_rules! debugln {
    () => {
        $crate::debug!("\n")
    };
    ($($arg:tt)*) => {
        $crate::debug!("{}\n", format_args!($($arg)*))
    };
}
