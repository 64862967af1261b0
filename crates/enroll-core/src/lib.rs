//! Enroll Core - Shared types for course section registration
//!
//! This crate provides the domain types shared between the orchestrator
//! (enrolld), the offline campus catalog (enroll-catalog) and the console.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod campus;
pub mod error;
pub mod model;
pub mod selection;

// Re-exports for convenience
pub use campus::{Authenticator, CampusClient};
pub use error::{AuthError, CampusError, DomainError, DomainResult, RegisterError};
pub use model::{CandidateClass, ClassName, Credentials, Sector, SectorName};
pub use selection::{
    compute_results, SelectionEntry, SelectionState, SelectionStatus, SelectionView,
};
