//! Orchestrator commands, errors, and events.
//!
//! This module defines the message types for communicating with the
//! `OrchestratorActor`:
//! - `OrchestratorCommand`: user intents and queries sent to the actor
//! - `OrchestratorError`: errors returned to the caller
//! - `EnrollEvent`: updates published to presentation layers

use enroll_core::{
    CampusError, CandidateClass, ClassName, DomainError, SectorName, SelectionView,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::registration::{DaemonId, DaemonStatus};

// ============================================================================
// Orchestrator Commands
// ============================================================================

/// Commands sent to the orchestrator actor.
///
/// Each command that needs an answer carries a oneshot channel for the
/// response.
#[derive(Debug)]
pub enum OrchestratorCommand {
    /// Pick a class from the current sector and start registering it.
    ///
    /// # Errors
    /// - `OrchestratorError::Domain(ClassNotFound)` if the current sector
    ///   has no class with this name
    Select {
        class: ClassName,
        respond_to: oneshot::Sender<Result<SelectOutcome, OrchestratorError>>,
    },

    /// Drop a pick and cancel its daemon. Answers whether anything was removed.
    Remove {
        class: ClassName,
        respond_to: oneshot::Sender<bool>,
    },

    /// Switch sector, clearing every pick.
    ///
    /// # Errors
    /// - `OrchestratorError::Domain(SectorNotFound)`; nothing changes
    ChangeSector {
        sector: SectorName,
        respond_to: oneshot::Sender<Result<(), OrchestratorError>>,
    },

    /// Replace the search keyword. Answers with the new result set.
    Search {
        keyword: String,
        respond_to: oneshot::Sender<Vec<CandidateClass>>,
    },

    /// Republish the sector list and current results.
    ///
    /// Fire-and-forget; used by presentation layers that subscribed late.
    Refresh,

    /// Get a snapshot of the selection state.
    GetSnapshot {
        respond_to: oneshot::Sender<OrchestratorSnapshot>,
    },

    /// Get the status of the active daemon for a class.
    GetDaemonStatus {
        class: ClassName,
        respond_to: oneshot::Sender<Option<DaemonStatus>>,
    },

    /// Cancel every daemon and stop the actor.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Result of a select command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A new daemon was spawned.
    Started(DaemonId),

    /// A daemon for this class was already running; nothing was spawned.
    AlreadyActive(DaemonId),
}

impl SelectOutcome {
    pub fn daemon_id(self) -> DaemonId {
        match self {
            Self::Started(id) | Self::AlreadyActive(id) => id,
        }
    }
}

/// Snapshot returned by `GetSnapshot`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorSnapshot {
    #[serde(flatten)]
    pub view: SelectionView,

    /// Classes with a running daemon, sorted by name.
    pub active_daemons: Vec<ClassName>,
}

// ============================================================================
// Orchestrator Errors
// ============================================================================

/// Errors that can occur during orchestrator operations.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// Unknown sector or class.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The campus system failed while fetching sectors.
    #[error("failed to fetch sectors: {0}")]
    Campus(#[from] CampusError),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("orchestrator channel closed")]
    ChannelClosed,
}

// ============================================================================
// Enroll Events
// ============================================================================

/// Events published by the orchestrator to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EnrollEvent {
    /// The list of sectors the user can switch between.
    SectorsAvailable { sectors: Vec<SectorName> },

    /// The result set changed (sector or keyword change).
    ResultsUpdated {
        sector: Option<SectorName>,
        keyword: String,
        results: Vec<CandidateClass>,
    },

    /// A daemon started registering a class.
    SelectionStarted { class: ClassName },

    /// The campus system confirmed the registration.
    SelectionFinished { class: ClassName },

    /// The daemon stopped on a non-recoverable error.
    SelectionFailed { class: ClassName, reason: String },

    /// The user removed a pick.
    SelectionRemoved { class: ClassName },

    /// A sector change dropped these picks.
    SelectionCleared { classes: Vec<ClassName> },
}
