//! Client interface for interacting with the OrchestratorActor.
//!
//! The `OrchestratorHandle` is what a presentation layer holds: it turns
//! user intents into commands and hands out event subscriptions.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `OrchestratorError::ChannelClosed`

use enroll_core::{CandidateClass, ClassName, SectorName};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{
    EnrollEvent, OrchestratorCommand, OrchestratorError, OrchestratorSnapshot, SelectOutcome,
};
use crate::registration::DaemonStatus;

/// Handle for interacting with the orchestrator actor.
///
/// Cheap to clone. The actor stops once every clone is dropped.
///
/// # Usage
///
/// ```ignore
/// let mut events = handle.subscribe();
/// handle.refresh().await?;
///
/// handle.select(ClassName::new("CS101")).await?;
/// while let Ok(event) = events.recv().await {
///     // render event
/// }
/// ```
#[derive(Clone)]
pub struct OrchestratorHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<OrchestratorCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<EnrollEvent>,
}

impl OrchestratorHandle {
    pub fn new(
        sender: mpsc::Sender<OrchestratorCommand>,
        event_sender: broadcast::Sender<EnrollEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Picks a class from the current sector and starts registering it.
    ///
    /// Selecting a class whose daemon is still running does not spawn a
    /// second one; the answer is `SelectOutcome::AlreadyActive`.
    ///
    /// # Errors
    ///
    /// - `OrchestratorError::Domain` if the class is not in the current sector
    /// - `OrchestratorError::ChannelClosed` if the actor has shut down
    pub async fn select(&self, class: ClassName) -> Result<SelectOutcome, OrchestratorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::Select {
                class,
                respond_to: tx,
            })
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;

        rx.await.map_err(|_| OrchestratorError::ChannelClosed)?
    }

    /// Drops a pick and cancels its daemon.
    ///
    /// Returns `Ok(false)` if the class was not picked.
    pub async fn remove(&self, class: ClassName) -> Result<bool, OrchestratorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::Remove {
                class,
                respond_to: tx,
            })
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;

        rx.await.map_err(|_| OrchestratorError::ChannelClosed)
    }

    /// Switches sector, cancelling every active daemon.
    ///
    /// # Errors
    ///
    /// - `OrchestratorError::Domain` if no sector has this exact name
    /// - `OrchestratorError::ChannelClosed` if the actor has shut down
    pub async fn change_sector(&self, sector: SectorName) -> Result<(), OrchestratorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::ChangeSector {
                sector,
                respond_to: tx,
            })
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;

        rx.await.map_err(|_| OrchestratorError::ChannelClosed)?
    }

    /// Replaces the search keyword and returns the new results.
    pub async fn search(
        &self,
        keyword: impl Into<String>,
    ) -> Result<Vec<CandidateClass>, OrchestratorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::Search {
                keyword: keyword.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;

        rx.await.map_err(|_| OrchestratorError::ChannelClosed)
    }

    /// Asks the actor to republish the sector list and current results.
    pub async fn refresh(&self) -> Result<(), OrchestratorError> {
        self.sender
            .send(OrchestratorCommand::Refresh)
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)
    }

    /// Gets a snapshot of the selection state.
    pub async fn snapshot(&self) -> Result<OrchestratorSnapshot, OrchestratorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::GetSnapshot { respond_to: tx })
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;

        rx.await.map_err(|_| OrchestratorError::ChannelClosed)
    }

    /// Gets the status of the active daemon for `class`.
    ///
    /// Returns `None` if no daemon is active for it or if communication
    /// with the actor fails.
    pub async fn daemon_status(&self, class: ClassName) -> Option<DaemonStatus> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(OrchestratorCommand::GetDaemonStatus {
                class,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Cancels every daemon and stops the actor.
    ///
    /// Shutting down an already stopped actor is not an error.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(OrchestratorCommand::Shutdown { respond_to: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Subscribe to orchestrator events.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrollEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still accepting commands.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
