//! Power control helpers (best-effort)
//!
//! Covers the ACPI-style poweroff ports of the common emulators. On real
//! hardware a proper ACPI parser would be needed to locate the PM1 control
//! block; if none of the writes take effect we halt forever.

use crate::arch::port::PortWord;
use core::arch::asm;

/// Attempt to power off. Works on QEMU/Bochs/VirtualBox; halts otherwise.
pub fn shutdown() -> ! {
    // SAFETY:
    // - The PM poweroff ports are write-only requests; an unsupported write
    //   is ignored by the platform and we fall through to the halt loop.
    unsafe {
        // QEMU ACPI S5
        PortWord::new(0x604).write(0x2000);
        // Bochs and older QEMU
        PortWord::new(0xB004).write(0x2000);
        // VirtualBox
        PortWord::new(0x4004).write(0x3400);

        // Fallback: stop the CPU.
        loop {
            asm!("cli; hlt");
        }
    }
}
