//! Progression conditions.
//!
//! The typed condition model, its configuration records and the factory that
//! turns records into conditions.

#![warn(missing_docs)]

// Model
pub mod condition;

// Construction
pub mod config;
pub mod error;
pub mod factory;
pub mod vocabulary;

// Collaborators
pub mod resolver;

// Re-exports
pub use condition::{CompositeCondition, Condition, ConditionLookup, EvalContext};
pub use config::ConditionConfig;
pub use error::{ConditionError, Result};
pub use factory::{ConditionFactory, Constructor};
pub use resolver::{NoResolver, PlaceholderResolver};
pub use vocabulary::Vocabulary;
