//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or out-of-range input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    ///
    /// Tenant mismatch is deliberately indistinguishable from absence so
    /// callers cannot enumerate other tenants' data.
    #[error("not found")]
    NotFound,

    /// A reduction or transfer would drive a position's quantity negative.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    /// Expected and recoverable; the caller may retry.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(available: Decimal, requested: Decimal) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }
}
