pub mod disk;
pub mod memory;

pub use disk::DiskIndexStore;
pub use memory::MemoryIndexStore;
