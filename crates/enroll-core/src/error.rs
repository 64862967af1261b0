//! Domain and campus error types following panic-free policy.

use crate::{ClassName, SectorName};
use thiserror::Error;

/// Errors raised by selection-state operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No sector with this exact name exists in the session
    #[error("Sector not found: {name}")]
    SectorNotFound { name: SectorName },

    /// No class with this name exists in the current sector
    #[error("Class not found in current sector: {name}")]
    ClassNotFound { name: ClassName },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failures talking to the campus system that are not registration verdicts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampusError {
    /// The campus system could not be reached or answered with garbage.
    #[error("campus system unavailable: {0}")]
    Unavailable(String),

    /// The campus system does not know this class.
    #[error("unknown class: {0}")]
    UnknownClass(ClassName),
}

/// Login failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Username or password rejected. The user may retry.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("authentication unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a failed register attempt.
///
/// Only [`RegisterError::CapacityExceeded`] is recoverable; a registration
/// daemon retries on it and treats every other variant as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The class section is full.
    #[error("class is at full capacity")]
    CapacityExceeded,

    /// The campus system refused the registration for another reason
    /// (time conflict, prerequisite, selection window closed, ...).
    #[error("registration rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Campus(#[from] CampusError),
}

impl RegisterError {
    /// Returns true if the attempt may be retried later.
    #[must_use]
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded)
    }
}
