//! Storage abstraction and implementations for player progress.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! reference implementation and an in-memory backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{ProgressStorage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
