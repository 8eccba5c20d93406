//! Errors raised by storefront rules (carts, pricing inputs, identifiers).

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A storefront rule rejected an operation.
///
/// Only deterministic failures live here. Supplier outages, timeouts and
/// storage faults are reported by the layers that talk to those systems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input is unacceptable as given (zero quantity, blank name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation would break a rule of the aggregate's current state,
    /// such as editing a cart that was already checked out.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Another writer got there first.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Cart lines always hold at least one unit.
    pub fn zero_quantity() -> Self {
        Self::validation("quantity must be at least 1")
    }

    /// The message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::InvariantViolation(m)
            | Self::InvalidId(m)
            | Self::NotFound(m)
            | Self::Conflict(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_drops_the_category_prefix() {
        let err = DomainError::not_found("cart item 3");
        assert_eq!(err.to_string(), "not found: cart item 3");
        assert_eq!(err.detail(), "cart item 3");
        assert_eq!(
            DomainError::zero_quantity(),
            DomainError::Validation("quantity must be at least 1".into())
        );
    }
}
