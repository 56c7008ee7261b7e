//! Test support: an in-memory [`DocumentStore`] so flows can be exercised without a hosted Appwrite project.

mod memory_store;

pub use memory_store::MemoryStore;
