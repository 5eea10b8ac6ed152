//! # DomainError
//!
//! Centralized error handling for the UniConnect services.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Listing, Message)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Validation failure (e.g., empty title, details for the wrong category)
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller may not act on this resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure reported by a repository adapter
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Shorthand used across the service layer.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = DomainError::not_found("Listing", "abc");
        assert_eq!(err.to_string(), "Listing not found with ID abc");
    }
}
