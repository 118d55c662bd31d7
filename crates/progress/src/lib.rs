//! Progress tracking and unlock evaluation.
//!
//! Counter store, condition registry, crossing detection and the service
//! that ties them together, plus the enforcement facade and placeholder
//! expansion built on top of it.

#![warn(missing_docs)]

// State
pub mod store;
pub mod registry;

// Evaluation
pub mod crossing;
pub mod service;

// Surfaces
pub mod facade;
pub mod placeholders;

pub mod error;

pub use crossing::detect_crossings;
pub use error::{ProgressError, Result};
pub use facade::{UnlockFacade, NOT_RESTRICTED_MESSAGE};
pub use placeholders::PlaceholderExpansion;
pub use registry::{ConditionRegistry, RegistryEntry, ReloadReport};
pub use service::{ProgressService, UNTRACKED_LOCK_MESSAGE};
pub use store::ProgressStore;
