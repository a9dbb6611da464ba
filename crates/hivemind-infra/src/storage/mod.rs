//! Storage engine implementations.

mod memory;

pub use memory::InMemoryStorage;
