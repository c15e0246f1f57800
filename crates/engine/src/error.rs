//! The module contains the errors the engine can throw.
//!
//! Most variants map one-to-one to user-visible conditions (a missing
//! balance, an over-large settlement). [`InvariantViolation`] is different:
//! it marks a conservation failure that should never occur in correct
//! operation and is treated as a programming defect, not a runtime
//! condition to recover from.
//!
//!  [`InvariantViolation`]: EngineError::InvariantViolation
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("balance not found: {0}")]
    BalanceNotFound(String),
    #[error("over-settlement: {0}")]
    OverSettlement(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotAuthenticated, Self::NotAuthenticated) => true,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::BalanceNotFound(a), Self::BalanceNotFound(b)) => a == b,
            (Self::OverSettlement(a), Self::OverSettlement(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
