//! Condition construction errors.

/// Result type for condition construction.
pub type Result<T> = std::result::Result<T, ConditionError>;

/// Errors raised while building a condition from configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    /// The record has no `type` field
    #[error("Condition type is missing")]
    MissingType,

    /// No constructor is registered for the kind
    #[error("Unknown condition type: {0}")]
    UnknownKind(String),

    /// An entity or material name is not part of the vocabulary
    #[error("Invalid {field}: {value}")]
    InvalidEnumValue {
        /// Field that carried the value
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The external metric provider is not available
    #[error("External metric provider is not available")]
    ResolverUnavailable,
}
