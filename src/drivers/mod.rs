//! Hardware drivers for the COROS kernel

pub mod keyboard;
pub mod screen;
pub mod serial;
