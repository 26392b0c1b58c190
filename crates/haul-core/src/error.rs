//! # Error Types
//!
//! Shared error types for the Haul Stack. Domain crates define their own
//! `thiserror` enums with structured fields and wrap [`ValidationError`]
//! where they reject missing or malformed input.

use thiserror::Error;

/// Top-level error type for core parsing and serialization failures.
#[derive(Error, Debug)]
pub enum HaulError {
    /// Input could not be parsed into the expected type.
    #[error("parse error: {0}")]
    Parse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A request was rejected before any state changed.
///
/// Always names the offending field so callers can point the user at it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value was absent.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A value was present but unacceptable.
    #[error("{field} is invalid: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Shorthand for [`ValidationError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// The field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field } | Self::Invalid { field, .. } => field,
        }
    }
}

/// Reject `None` and empty/whitespace strings for a required text field.
pub fn require_text<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::missing(field)),
    }
}
