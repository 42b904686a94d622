//! Result log implementations.

pub mod file;

#[cfg(feature = "memory")]
pub mod memory;

pub use file::FileResultLog;

#[cfg(feature = "memory")]
pub use memory::MemoryResultLog;
