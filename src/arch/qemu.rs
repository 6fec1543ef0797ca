//! QEMU Debug Exit Device
//!
//! Lets a test kernel signal its verdict to the host. QEMU must be started
//! with `-device isa-debug-exit,iobase=0xf4,iosize=0x04`; the value written
//! to port 0xF4 is transformed into host exit code `(value << 1) | 1`, so
//! 0x10 becomes 33 (success) and 0x11 becomes 35 (failure).

use crate::arch::port::PortByte;

/// QEMU debug exit device I/O port
const QEMU_EXIT_PORT: u16 = 0xF4;

/// Exit codes for QEMU (these get transformed by QEMU)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QemuExitCode {
    /// QEMU exits with code 33
    Success = 0x10,
    /// QEMU exits with code 35
    Failed = 0x11,
}

/// Exit QEMU with the specified exit code.
///
/// Outside QEMU (or without the debug-exit device) the write is ignored and
/// the CPU halts instead.
pub fn exit_qemu(exit_code: QemuExitCode) -> ! {
    // SAFETY:
    // - Writing the exit device port either terminates the VM or is ignored.
    unsafe {
        PortByte::new(QEMU_EXIT_PORT).write(exit_code as u8);
    }

    loop {
        // SAFETY:
        // - `hlt` is valid in ring 0.
        unsafe {
            core::arch::asm!("hlt");
        }
    }
}
