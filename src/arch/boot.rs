//! Multiboot entry glue.
//!
//! QEMU's `-kernel` loader (and any Multiboot 1 bootloader) scans the first
//! 8 KiB of the image for the header below, loads the ELF segments, enters
//! 32-bit protected mode with paging off, and jumps to `_start`. The
//! Multiboot handoff leaves ESP undefined, so `_start` installs the boot
//! stack before any Rust code runs and then calls the `kmain` symbol
//! provided by the final binary (the kernel image or a test kernel).

use core::arch::global_asm;

global_asm!(
    r#"
    .section .multiboot_header, "a"
    .balign 4
    .long 0x1BADB002            // magic
    .long 0x00000000            // flags
    .long 0xE4524FFE            // checksum: -(magic + flags)

    .section .bss
    .balign 16
    boot_stack_bottom:
    .skip 16384
    boot_stack_top:

    .section .text
    .global _start
    .type _start, @function
    _start:
        lea esp, [boot_stack_top]
        xor ebp, ebp
        call kmain
    1:
        cli
        hlt
        jmp 1b
    "#
);
