//! Customer store implementations for Paygate.

pub mod memory;

pub use memory::MemoryStore;
