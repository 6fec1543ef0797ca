//! Test Framework for the COROS kernel
//!
//! Integration tests run as freestanding kernels inside QEMU: each test
//! binary boots, runs its `#[test_case]` functions, and reports the verdict
//! through the isa-debug-exit device. Results are printed on the serial
//! port.
//!
//! Mark test functions with `#[test_case]` and run `cargo test`; the cargo
//! runner boots each test kernel with the debug-exit device attached and
//! maps QEMU's exit code back to pass/fail.

use crate::arch::qemu::{exit_qemu, QemuExitCode};
use crate::{debug, debugln};

/// Trait for types that can be run as tests
pub trait Testable {
    /// Run the test and report results
    fn run(&self);
}

impl<T: Fn()> Testable for T {
    fn run(&self) {
        debug!("  {}...", core::any::type_name::<T>());

        // If the test panics, the panic handler reports the failure.
        self();

        debugln!(" [ok]");
    }
}

/// The main test runner function, called by the test harness with every
/// `#[test_case]` in the binary.
pub fn test_runner(tests: &[&dyn Testable]) {
    debugln!("Running {} tests:", tests.len());
    debugln!();

    for test in tests {
        test.run();
    }

    debugln!();
    debugln!("All {} tests passed!", tests.len());

    exit_qemu(QemuExitCode::Success);
}

/// Panic path for test kernels: report the failure location and exit QEMU
/// with a failing code.
pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    debugln!(" [FAILED]");
    debugln!();

    if let Some(location) = info.location() {
        debugln!("Location: {}:{}", location.file(), location.line());
    }
    debugln!("Message: {}", info.message());
    debugln!();

    exit_qemu(QemuExitCode::Failed);
}
