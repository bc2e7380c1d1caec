//! Adapters implementing the domain ports.

pub mod clock;
pub mod identity;
pub mod in_memory;
pub mod local_uploader;
pub mod notifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
