//! Selection orchestrator using Actor pattern.
//!
//! The orchestrator is the single owner of selection state and of the
//! registration daemons. Presentation layers talk to it through an
//! `OrchestratorHandle`; daemons talk to it through report messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ OrchestratorCommand ┌──────────────────┐  EnrollEvent  ┌──────────────┐
//! │  Presentation   │────────────────────▶│ OrchestratorActor│──────────────▶│ Presentation │
//! │ (handle clones) │   (mpsc + oneshot)  │ SelectionState + │  (broadcast)  │ subscribers  │
//! └─────────────────┘                     │ daemon map       │               └──────────────┘
//!                                         └───┬──────────▲───┘
//!                                    spawn /  │          │ DaemonReport
//!                                    cancel   ▼          │ (mpsc)
//!                                   ┌────────────────────┴──┐
//!                                   │ RegistrationDaemon × N│──▶ CampusClient
//!                                   └───────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use enroll_core::{CampusClient, SelectionState};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

mod actor;
mod commands;
mod handle;

pub use actor::OrchestratorActor;
pub use commands::{
    EnrollEvent, OrchestratorCommand, OrchestratorError, OrchestratorSnapshot, SelectOutcome,
};
pub use handle::OrchestratorHandle;

use crate::registration::DEFAULT_RETRY_INTERVAL;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Runtime knobs of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Wait between two register attempts of a daemon.
    pub retry_interval: Duration,

    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Fetch the sector list, spawn the orchestrator actor, and return a handle.
///
/// The first sector becomes current. The actor publishes
/// `SectorsAvailable` and `ResultsUpdated` as soon as it starts; subscribers
/// that attach later can call [`OrchestratorHandle::refresh`].
///
/// # Errors
///
/// `OrchestratorError::Campus` if the sector list cannot be fetched.
pub async fn spawn_orchestrator<C: CampusClient>(
    client: Arc<C>,
    config: OrchestratorConfig,
) -> Result<OrchestratorHandle, OrchestratorError> {
    let sectors = client.list_sectors().await?;
    info!(sectors = sectors.len(), "Fetched selection sectors");

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

    let actor = OrchestratorActor::new(
        cmd_rx,
        event_tx.clone(),
        client,
        SelectionState::new(sectors),
        config.retry_interval,
    );
    tokio::spawn(actor.run());

    Ok(OrchestratorHandle::new(cmd_tx, event_tx))
}
