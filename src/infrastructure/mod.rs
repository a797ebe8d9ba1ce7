//! Adapters behind the domain ports.

pub mod clock;
pub mod events;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
