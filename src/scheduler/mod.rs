//! Scheduler module facade.
//!
//! The cooperative task system is implemented in `cooperative.rs` and
//! re-exported here so `crate::scheduler::*` call sites stay clean.

mod cooperative;

// Re-exported as scheduler facade API for library consumers/tests.
// The binary target may not reference every symbol directly.
#[allow(unused_imports)]
pub use cooperative::*;
