//! Shared test doubles for enrolld integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use enroll_core::{CampusClient, CampusError, CandidateClass, ClassName, RegisterError, Sector};
use enrolld::EnrollEvent;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Campus double replaying scripted register results per class.
///
/// Once a class's script runs out every further attempt reports
/// `CapacityExceeded`.
#[derive(Default)]
pub struct ScriptedCampus {
    sectors: Vec<Sector>,
    scripts: Mutex<HashMap<ClassName, VecDeque<Result<(), RegisterError>>>>,
    registered: Mutex<HashSet<ClassName>>,
    status_down: HashSet<ClassName>,
    calls: Mutex<HashMap<ClassName, u32>>,
}

impl ScriptedCampus {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self {
            sectors,
            ..Self::default()
        }
    }

    /// Sets the register results for `class`, in order.
    pub fn script(self, class: &str, results: Vec<Result<(), RegisterError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(ClassName::new(class), results.into());
        self
    }

    /// Marks `class` as already held by the student.
    pub fn already_registered(self, class: &str) -> Self {
        self.registered.lock().unwrap().insert(ClassName::new(class));
        self
    }

    /// Makes the registration status query for `class` fail.
    pub fn status_unavailable(mut self, class: &str) -> Self {
        self.status_down.insert(ClassName::new(class));
        self
    }

    pub fn register_calls(&self, class: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&ClassName::new(class))
            .copied()
            .unwrap_or(0)
    }
}

impl CampusClient for ScriptedCampus {
    async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
        Ok(self.sectors.clone())
    }

    async fn is_registered(&self, class: &ClassName) -> Result<bool, CampusError> {
        if self.status_down.contains(class) {
            return Err(CampusError::Unavailable("status service down".into()));
        }
        Ok(self.registered.lock().unwrap().contains(class))
    }

    async fn register(&self, class: &ClassName) -> Result<(), RegisterError> {
        *self.calls.lock().unwrap().entry(class.clone()).or_insert(0) += 1;

        let result = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(class)
            .and_then(|script| script.pop_front())
            .unwrap_or(Err(RegisterError::CapacityExceeded));

        if result.is_ok() {
            self.registered.lock().unwrap().insert(class.clone());
        }
        result
    }
}

/// Campus that fails to list sectors.
pub struct OfflineCampus;

impl CampusClient for OfflineCampus {
    async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
        Err(CampusError::Unavailable("connection refused".into()))
    }

    async fn is_registered(&self, _class: &ClassName) -> Result<bool, CampusError> {
        Err(CampusError::Unavailable("connection refused".into()))
    }

    async fn register(&self, _class: &ClassName) -> Result<(), RegisterError> {
        Err(CampusError::Unavailable("connection refused".into()).into())
    }
}

pub fn class(name: &str, section: &str) -> CandidateClass {
    CandidateClass::new(name, section, "30/30", 3.0)
}

/// Two sectors: Pool A with CS101, MA201, CS205; Pool B with PH100.
pub fn two_sectors() -> Vec<Sector> {
    vec![
        Sector::new(
            "Elective Pool A",
            vec![class("CS101", "A"), class("MA201", "B"), class("CS205", "C")],
        ),
        Sector::new("Elective Pool B", vec![class("PH100", "A")]),
    ]
}

/// Waits (in paused test time) for the first event matching `pred`.
pub async fn wait_for<F>(events: &mut broadcast::Receiver<EnrollEvent>, pred: F) -> EnrollEvent
where
    F: Fn(&EnrollEvent) -> bool,
{
    loop {
        let event = timeout(Duration::from_secs(600), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Collects every event already queued.
pub fn drain(events: &mut broadcast::Receiver<EnrollEvent>) -> Vec<EnrollEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
