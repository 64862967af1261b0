//! `StaticCampus`: an in-process campus system backed by a [`Catalog`].
//!
//! Seat counts are shared by every session authenticated against the same
//! `StaticCampus`, so two students competing for the last seat behave the
//! way they would on the real system.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use enroll_core::{
    AuthError, Authenticator, CampusClient, CampusError, CandidateClass, ClassName, Credentials,
    RegisterError, Sector,
};
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogAccount};

#[derive(Debug)]
struct Seats {
    section: String,
    credit: f32,
    capacity: u32,
    registered: u32,
    attempts: u32,
    opens_after: Option<u32>,
    reject: Option<String>,
}

impl Seats {
    fn is_full(&self) -> bool {
        self.registered >= self.capacity
    }

    fn students_registered(&self) -> String {
        format!("{}/{}", self.registered, self.capacity)
    }
}

#[derive(Debug, Default)]
struct CampusState {
    /// Sector names and their class names, in catalog order.
    layout: Vec<(String, Vec<ClassName>)>,
    seats: HashMap<ClassName, Seats>,
    /// (username, class) pairs holding a seat.
    holdings: HashSet<(String, ClassName)>,
}

/// Offline campus system.
#[derive(Debug, Clone)]
pub struct StaticCampus {
    accounts: Arc<Vec<CatalogAccount>>,
    state: Arc<Mutex<CampusState>>,
}

impl StaticCampus {
    /// Builds a campus from a validated catalog.
    pub fn new(catalog: Catalog) -> Self {
        let mut state = CampusState::default();

        for sector in catalog.sectors {
            let mut names = Vec::with_capacity(sector.classes.len());
            for class in sector.classes {
                let name = ClassName::new(class.name);
                state.seats.insert(
                    name.clone(),
                    Seats {
                        section: class.section,
                        credit: class.credit,
                        capacity: class.capacity,
                        registered: class.registered,
                        attempts: 0,
                        opens_after: class.opens_after,
                        reject: class.reject,
                    },
                );
                names.push(name);
            }
            state.layout.push((sector.name, names));
        }

        Self {
            accounts: Arc::new(catalog.accounts),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Opens a session for `username` without checking a password.
    pub fn session_for(&self, username: impl Into<String>) -> StaticSession {
        StaticSession {
            username: username.into(),
            state: Arc::clone(&self.state),
        }
    }
}

impl Authenticator for StaticCampus {
    type Client = StaticSession;

    async fn authenticate(&self, credentials: &Credentials) -> Result<StaticSession, AuthError> {
        let known = self
            .accounts
            .iter()
            .any(|a| a.username == credentials.username && a.password == credentials.password);

        if !known {
            debug!(username = %credentials.username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        info!(username = %credentials.username, "Login accepted");
        Ok(self.session_for(credentials.username.clone()))
    }
}

/// An authenticated session on a [`StaticCampus`].
#[derive(Debug, Clone)]
pub struct StaticSession {
    username: String,
    state: Arc<Mutex<CampusState>>,
}

impl StaticSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    fn lock(&self) -> Result<MutexGuard<'_, CampusState>, CampusError> {
        self.state
            .lock()
            .map_err(|_| CampusError::Unavailable("campus state poisoned".to_string()))
    }
}

impl CampusClient for StaticSession {
    async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
        let state = self.lock()?;

        let sectors = state
            .layout
            .iter()
            .map(|(sector, names)| {
                let classes = names
                    .iter()
                    .filter_map(|name| {
                        state.seats.get(name).map(|seats| {
                            CandidateClass::new(
                                name.clone(),
                                seats.section.clone(),
                                seats.students_registered(),
                                seats.credit,
                            )
                        })
                    })
                    .collect();
                Sector::new(sector.as_str(), classes)
            })
            .collect();

        Ok(sectors)
    }

    async fn is_registered(&self, class: &ClassName) -> Result<bool, CampusError> {
        let state = self.lock()?;
        if !state.seats.contains_key(class) {
            return Err(CampusError::UnknownClass(class.clone()));
        }
        Ok(state
            .holdings
            .contains(&(self.username.clone(), class.clone())))
    }

    async fn register(&self, class: &ClassName) -> Result<(), RegisterError> {
        let mut state = self.lock()?;
        let key = (self.username.clone(), class.clone());

        if state.holdings.contains(&key) {
            return Ok(());
        }

        let seats = state
            .seats
            .get_mut(class)
            .ok_or_else(|| CampusError::UnknownClass(class.clone()))?;

        if let Some(reason) = &seats.reject {
            return Err(RegisterError::Rejected(reason.clone()));
        }

        seats.attempts += 1;

        if seats.is_full() {
            match seats.opens_after {
                // Someone dropped the class.
                Some(n) if seats.attempts > n => {
                    seats.registered = seats.capacity.saturating_sub(1);
                }
                _ => {
                    debug!(class = %class, attempts = seats.attempts, "Class full");
                    return Err(RegisterError::CapacityExceeded);
                }
            }
        }

        seats.registered += 1;
        let taken = seats.students_registered();
        state.holdings.insert(key);

        info!(class = %class, username = %self.username, seats = %taken, "Seat taken");
        Ok(())
    }
}
