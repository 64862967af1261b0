//! Capability interface of the external campus system.
//!
//! The core never depends on a concrete campus implementation: everything it
//! needs is the four operations below. Real HTTP clients, the offline
//! catalog in `enroll-catalog` and test doubles all implement these traits.

use std::future::Future;

use crate::error::{AuthError, CampusError, RegisterError};
use crate::model::{ClassName, Credentials, Sector};

/// Authenticated access to the campus selection system.
pub trait CampusClient: Send + Sync + 'static {
    /// Fetches every selection sector with its classes.
    ///
    /// The result is a snapshot: later changes on the campus side are not
    /// reflected until the next call.
    fn list_sectors(&self) -> impl Future<Output = Result<Vec<Sector>, CampusError>> + Send;

    /// Returns true if the logged-in student already holds a seat in `class`.
    fn is_registered(
        &self,
        class: &ClassName,
    ) -> impl Future<Output = Result<bool, CampusError>> + Send;

    /// Attempts to register the logged-in student into `class` once.
    fn register(&self, class: &ClassName)
        -> impl Future<Output = Result<(), RegisterError>> + Send;
}

/// Produces an authenticated [`CampusClient`] from credentials.
pub trait Authenticator: Send + Sync {
    type Client: CampusClient;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Client, AuthError>> + Send;
}
