//! Win32 platform integration.

pub mod probe;

pub use probe::Win32Probe;
