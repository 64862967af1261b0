//! Selection state: current sector, search keyword, results and picks.
//!
//! `SelectionState` is a plain in-memory structure with no interior
//! mutability. It is owned and mutated by exactly one task (the orchestrator
//! actor); registration daemons never see it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::model::{CandidateClass, ClassName, Sector, SectorName};

// ============================================================================
// Result Computation
// ============================================================================

/// Filters `classes` by `keyword`.
///
/// An empty keyword returns every class. Otherwise a class is kept when its
/// name or section label contains the keyword as a case-sensitive substring.
/// The relative order of `classes` is always preserved.
#[must_use]
pub fn compute_results(classes: &[CandidateClass], keyword: &str) -> Vec<CandidateClass> {
    if keyword.is_empty() {
        return classes.to_vec();
    }
    classes
        .iter()
        .filter(|class| class.matches_keyword(keyword))
        .cloned()
        .collect()
}

// ============================================================================
// Selections
// ============================================================================

/// Registration progress of a picked class, as far as the user is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionStatus {
    /// A registration daemon is retrying this class.
    Registering,

    /// The campus system confirmed the registration.
    Registered,

    /// The daemon stopped on a non-recoverable error.
    Failed { reason: String },
}

impl SelectionStatus {
    /// Short label for list display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registering => "registering...",
            Self::Registered => "registered",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A class the user picked, with its registration progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub class: CandidateClass,
    pub status: SelectionStatus,
    pub selected_at: DateTime<Utc>,
}

impl SelectionEntry {
    fn new(class: CandidateClass) -> Self {
        Self {
            class,
            status: SelectionStatus::Registering,
            selected_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &ClassName {
        &self.class.name
    }
}

// ============================================================================
// Selection State
// ============================================================================

/// In-memory view of what the user is browsing and what they picked.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// Sector snapshot fetched from the campus client.
    sectors: Vec<Sector>,

    /// Index into `sectors` of the current sector.
    current: Option<usize>,

    keyword: String,

    /// Cached `compute_results(current sector, keyword)`.
    results: Vec<CandidateClass>,

    /// Picked classes in pick order, unique by name.
    selections: Vec<SelectionEntry>,
}

impl SelectionState {
    /// Creates the state with the first sector (if any) as current.
    pub fn new(sectors: Vec<Sector>) -> Self {
        let current = if sectors.is_empty() { None } else { Some(0) };
        let mut state = Self {
            sectors,
            current,
            keyword: String::new(),
            results: Vec::new(),
            selections: Vec::new(),
        };
        state.refresh_results();
        state
    }

    /// Names of all available sectors, in campus order.
    pub fn sector_names(&self) -> Vec<SectorName> {
        self.sectors.iter().map(|s| s.name.clone()).collect()
    }

    pub fn current_sector(&self) -> Option<&Sector> {
        self.current.and_then(|i| self.sectors.get(i))
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn results(&self) -> &[CandidateClass] {
        &self.results
    }

    pub fn selections(&self) -> &[SelectionEntry] {
        &self.selections
    }

    pub fn selection(&self, name: &ClassName) -> Option<&SelectionEntry> {
        self.selections.iter().find(|e| e.name() == name)
    }

    /// Switches to the sector named `name`.
    ///
    /// Every selection belongs to the previous sector's class list, so all of
    /// them are cleared and returned; the caller is responsible for
    /// cancelling their daemons. Results are recomputed with the current
    /// keyword.
    ///
    /// # Errors
    ///
    /// `DomainError::SectorNotFound` if no sector has exactly this name. The
    /// state is left unchanged in that case.
    pub fn set_sector(&mut self, name: &SectorName) -> DomainResult<Vec<SelectionEntry>> {
        let index = self
            .sectors
            .iter()
            .position(|s| &s.name == name)
            .ok_or_else(|| DomainError::SectorNotFound { name: name.clone() })?;

        self.current = Some(index);
        let cleared = std::mem::take(&mut self.selections);
        self.refresh_results();

        debug!(
            sector = %name,
            cleared = cleared.len(),
            results = self.results.len(),
            "Sector changed"
        );

        Ok(cleared)
    }

    /// Replaces the search keyword and recomputes results.
    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
        self.refresh_results();
    }

    /// Looks up a class by name in the current sector's full class list.
    pub fn find_class(&self, name: &ClassName) -> Option<&CandidateClass> {
        self.current_sector().and_then(|s| s.find_class(name))
    }

    /// Records `class` as picked and registering.
    ///
    /// Returns `false` if the class is already registering. A class that was
    /// previously registered or failed is restarted.
    pub fn select(&mut self, class: CandidateClass) -> bool {
        match self.selections.iter_mut().find(|e| e.name() == &class.name) {
            Some(entry) if entry.status == SelectionStatus::Registering => false,
            Some(entry) => {
                *entry = SelectionEntry::new(class);
                true
            }
            None => {
                self.selections.push(SelectionEntry::new(class));
                true
            }
        }
    }

    /// Drops the pick for `name`, returning it if present.
    pub fn remove(&mut self, name: &ClassName) -> Option<SelectionEntry> {
        let index = self.selections.iter().position(|e| e.name() == name)?;
        Some(self.selections.remove(index))
    }

    /// Marks the pick as confirmed by the campus system.
    ///
    /// Returns `false` if there is no such pick.
    pub fn mark_registered(&mut self, name: &ClassName) -> bool {
        self.set_status(name, SelectionStatus::Registered)
    }

    /// Marks the pick as failed with `reason`.
    pub fn mark_failed(&mut self, name: &ClassName, reason: impl Into<String>) -> bool {
        self.set_status(
            name,
            SelectionStatus::Failed {
                reason: reason.into(),
            },
        )
    }

    /// Serialisable snapshot for presentation.
    pub fn view(&self) -> SelectionView {
        SelectionView {
            sectors: self.sector_names(),
            sector: self.current_sector().map(|s| s.name.clone()),
            keyword: self.keyword.clone(),
            results: self.results.clone(),
            selections: self.selections.clone(),
        }
    }

    fn set_status(&mut self, name: &ClassName, status: SelectionStatus) -> bool {
        match self.selections.iter_mut().find(|e| e.name() == name) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    fn refresh_results(&mut self) {
        self.results = match self.current_sector() {
            Some(sector) => compute_results(&sector.classes, &self.keyword),
            None => Vec::new(),
        };
    }
}

/// Snapshot of [`SelectionState`] handed to presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionView {
    pub sectors: Vec<SectorName>,
    pub sector: Option<SectorName>,
    pub keyword: String,
    pub results: Vec<CandidateClass>,
    pub selections: Vec<SelectionEntry>,
}
