//! Background tasks launched by the shell.

pub mod heartbeat;
