//! Error types for the enroll console.
//!
//! **Panic-Free Policy:** No `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io;

use enroll_core::AuthError;
use enrolld::OrchestratorError;
use thiserror::Error;

// ============================================================================
// Console Error Type
// ============================================================================

/// Console front-end errors.
///
/// Errors the user can act on (bad command, unknown class, full class) are
/// printed and the console keeps going; only these end the session.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Reading commands or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The orchestrator could not be reached or refused to start.
    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// Login failed for a reason retrying will not fix.
    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    /// Input ended before a successful login.
    #[error("Login cancelled")]
    LoginCancelled,

    /// An event or view could not be encoded as JSON.
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
