//! # DomainError
//!
//! Centralized error handling for the idea board.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or invalid required field (e.g., blank title, unknown category)
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure (e.g., DB down, constraint violation)
    #[error("store error: {0}")]
    Store(String),
}

impl DomainError {
    /// The bare message, without the variant prefix. Used in API bodies.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(msg) | DomainError::Store(msg) => msg,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
