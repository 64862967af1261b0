//! Orchestrator actor - owns selection state and the daemon map.
//!
//! The OrchestratorActor is the single owner of `SelectionState` and of the
//! map of active registration daemons. It receives commands via an mpsc
//! channel, receives daemon reports via a second mpsc channel, and
//! publishes events via broadcast.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are ignored: a caller that dropped its receiver
//!   no longer cares about the answer

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use enroll_core::{CampusClient, CandidateClass, ClassName, DomainError, SectorName, SelectionState};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::commands::{
    EnrollEvent, OrchestratorCommand, OrchestratorError, OrchestratorSnapshot, SelectOutcome,
};
use crate::registration::{DaemonHandle, DaemonId, DaemonOutcome, DaemonReport, RegistrationDaemon};

/// Buffer of the daemon report channel.
const REPORT_BUFFER: usize = 100;

/// The orchestrator actor.
///
/// # Ownership
///
/// The actor owns:
/// - `selection`: sectors, keyword, results and picks
/// - `daemons`: one `DaemonHandle` per class currently registering
///
/// Invariant: the keys of `daemons` are exactly the picks whose status is
/// `Registering`.
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands and reports
/// sequentially, so neither structure needs a lock.
pub struct OrchestratorActor<C> {
    /// Command receiver
    receiver: mpsc::Receiver<OrchestratorCommand>,

    /// Daemon completion reports
    reports: mpsc::Receiver<DaemonReport>,

    /// Cloned into every spawned daemon
    report_sender: mpsc::Sender<DaemonReport>,

    client: Arc<C>,

    selection: SelectionState,

    daemons: HashMap<ClassName, DaemonHandle>,

    next_daemon_id: u64,

    retry_interval: Duration,

    /// Event publisher for presentation layers
    event_publisher: broadcast::Sender<EnrollEvent>,
}

impl<C: CampusClient> OrchestratorActor<C> {
    /// Creates a new orchestrator actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `event_publisher` - Broadcast channel for publishing events
    /// * `client` - Campus client handed to every daemon
    /// * `selection` - Initial selection state
    /// * `retry_interval` - Wait between register attempts
    pub fn new(
        receiver: mpsc::Receiver<OrchestratorCommand>,
        event_publisher: broadcast::Sender<EnrollEvent>,
        client: Arc<C>,
        selection: SelectionState,
        retry_interval: Duration,
    ) -> Self {
        let (report_sender, reports) = mpsc::channel(REPORT_BUFFER);
        Self {
            receiver,
            reports,
            report_sender,
            client,
            selection,
            daemons: HashMap::new(),
            next_daemon_id: 1,
            retry_interval,
            event_publisher,
        }
    }

    /// Runs the actor control loop.
    ///
    /// Processes commands and daemon reports until a `Shutdown` command
    /// arrives or every command sender is dropped. All daemons still running
    /// at that point are cancelled.
    pub async fn run(mut self) {
        info!(
            sectors = self.selection.sector_names().len(),
            "Orchestrator starting"
        );
        self.publish_sectors();
        self.publish_results();

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).is_break() {
                            break;
                        }
                    }
                    None => break,
                },

                Some(report) = self.reports.recv() => self.handle_report(report),
            }
        }

        let cancelled = self.cancel_all();
        info!(cancelled, "Orchestrator stopped");
    }

    /// Dispatches a command to the appropriate handler.
    ///
    /// Breaks on `Shutdown`, after every daemon has been cancelled.
    fn handle_command(&mut self, cmd: OrchestratorCommand) -> ControlFlow<()> {
        match cmd {
            OrchestratorCommand::Select { class, respond_to } => {
                let result = self.handle_select(class);
                let _ = respond_to.send(result);
            }
            OrchestratorCommand::Remove { class, respond_to } => {
                let result = self.handle_remove(&class);
                let _ = respond_to.send(result);
            }
            OrchestratorCommand::ChangeSector { sector, respond_to } => {
                let result = self.handle_change_sector(&sector);
                let _ = respond_to.send(result);
            }
            OrchestratorCommand::Search {
                keyword,
                respond_to,
            } => {
                let result = self.handle_search(keyword);
                let _ = respond_to.send(result);
            }
            OrchestratorCommand::Refresh => {
                self.publish_sectors();
                self.publish_results();
            }
            OrchestratorCommand::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            OrchestratorCommand::GetDaemonStatus { class, respond_to } => {
                let status = self.daemons.get(&class).map(DaemonHandle::status);
                let _ = respond_to.send(status);
            }
            OrchestratorCommand::Shutdown { respond_to } => {
                let cancelled = self.cancel_all();
                debug!(cancelled, "Shutdown requested");
                let _ = respond_to.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_select(&mut self, name: ClassName) -> Result<SelectOutcome, OrchestratorError> {
        if let Some(handle) = self.daemons.get(&name) {
            debug!(class = %name, daemon_id = %handle.id(), "Daemon already active, not spawning another");
            return Ok(SelectOutcome::AlreadyActive(handle.id()));
        }

        let class = self
            .selection
            .find_class(&name)
            .cloned()
            .ok_or_else(|| DomainError::ClassNotFound { name: name.clone() })?;

        self.selection.select(class);

        let id = DaemonId::new(self.next_daemon_id);
        self.next_daemon_id += 1;

        let handle = RegistrationDaemon::spawn(
            id,
            name.clone(),
            Arc::clone(&self.client),
            self.retry_interval,
            self.report_sender.clone(),
        );
        self.daemons.insert(name.clone(), handle);

        info!(
            class = %name,
            daemon_id = %id,
            active = self.daemons.len(),
            "Selection started"
        );
        self.publish(EnrollEvent::SelectionStarted { class: name });

        Ok(SelectOutcome::Started(id))
    }

    fn handle_remove(&mut self, name: &ClassName) -> bool {
        let daemon = self.daemons.remove(name);
        if let Some(handle) = &daemon {
            handle.cancel();
        }
        let entry = self.selection.remove(name);

        if daemon.is_none() && entry.is_none() {
            debug!(class = %name, "Nothing to remove");
            return false;
        }

        info!(
            class = %name,
            cancelled_daemon = daemon.is_some(),
            "Selection removed"
        );
        self.publish(EnrollEvent::SelectionRemoved {
            class: name.clone(),
        });
        true
    }

    fn handle_change_sector(&mut self, sector: &SectorName) -> Result<(), OrchestratorError> {
        let cleared = self.selection.set_sector(sector).map_err(|e| {
            warn!(sector = %sector, "Unknown sector requested");
            e
        })?;

        let cancelled = self.cancel_all();
        info!(
            sector = %sector,
            cleared = cleared.len(),
            cancelled,
            "Sector changed"
        );

        self.publish(EnrollEvent::SelectionCleared {
            classes: cleared.into_iter().map(|e| e.class.name).collect(),
        });
        self.publish_results();
        Ok(())
    }

    fn handle_search(&mut self, keyword: String) -> Vec<CandidateClass> {
        self.selection.set_keyword(keyword);
        debug!(
            keyword = %self.selection.keyword(),
            results = self.selection.results().len(),
            "Search updated"
        );
        self.publish_results();
        self.selection.results().to_vec()
    }

    // ========================================================================
    // Daemon Reports
    // ========================================================================

    fn handle_report(&mut self, report: DaemonReport) {
        let current = self.daemons.get(&report.class).map(DaemonHandle::id);
        if current != Some(report.id) {
            debug!(
                class = %report.class,
                daemon_id = %report.id,
                "Ignoring report from a replaced daemon"
            );
            return;
        }

        self.daemons.remove(&report.class);

        match report.outcome {
            DaemonOutcome::Succeeded => {
                self.selection.mark_registered(&report.class);
                info!(class = %report.class, "Selection finished");
                self.publish(EnrollEvent::SelectionFinished {
                    class: report.class,
                });
            }
            DaemonOutcome::Failed(error) => {
                let reason = error.to_string();
                self.selection.mark_failed(&report.class, reason.clone());
                warn!(class = %report.class, reason = %reason, "Selection failed");
                self.publish(EnrollEvent::SelectionFailed {
                    class: report.class,
                    reason,
                });
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Cancels and forgets every active daemon, returning how many there were.
    fn cancel_all(&mut self) -> usize {
        let count = self.daemons.len();
        for (name, handle) in self.daemons.drain() {
            handle.cancel();
            debug!(class = %name, daemon_id = %handle.id(), "Daemon cancelled");
        }
        count
    }

    fn snapshot(&self) -> OrchestratorSnapshot {
        let mut active_daemons: Vec<ClassName> = self.daemons.keys().cloned().collect();
        active_daemons.sort();
        OrchestratorSnapshot {
            view: self.selection.view(),
            active_daemons,
        }
    }

    fn publish_sectors(&self) {
        self.publish(EnrollEvent::SectorsAvailable {
            sectors: self.selection.sector_names(),
        });
    }

    fn publish_results(&self) {
        self.publish(EnrollEvent::ResultsUpdated {
            sector: self.selection.current_sector().map(|s| s.name.clone()),
            keyword: self.selection.keyword().to_string(),
            results: self.selection.results().to_vec(),
        });
    }

    /// Publishes an event, ignoring the error when nobody is subscribed.
    fn publish(&self, event: EnrollEvent) {
        let _ = self.event_publisher.send(event);
    }

    #[cfg(test)]
    pub fn daemon_count(&self) -> usize {
        self.daemons.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enroll_core::{CampusError, RegisterError, Sector, SelectionStatus};
    use tokio::sync::oneshot;

    /// Campus where every class is permanently full.
    struct FullCampus;

    impl CampusClient for FullCampus {
        async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
            Ok(sectors())
        }

        async fn is_registered(&self, _class: &ClassName) -> Result<bool, CampusError> {
            Ok(false)
        }

        async fn register(&self, _class: &ClassName) -> Result<(), RegisterError> {
            Err(RegisterError::CapacityExceeded)
        }
    }

    fn sectors() -> Vec<Sector> {
        vec![
            Sector::new(
                "Elective Pool A",
                vec![
                    CandidateClass::new("CS101", "A", "30/30", 3.0),
                    CandidateClass::new("MA201", "B", "40/40", 4.0),
                ],
            ),
            Sector::new(
                "Elective Pool B",
                vec![CandidateClass::new("PH100", "A", "20/20", 2.0)],
            ),
        ]
    }

    fn create_actor() -> (
        mpsc::Sender<OrchestratorCommand>,
        OrchestratorActor<FullCampus>,
        broadcast::Receiver<EnrollEvent>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = broadcast::channel(16);
        let actor = OrchestratorActor::new(
            cmd_rx,
            event_tx,
            Arc::new(FullCampus),
            SelectionState::new(sectors()),
            Duration::from_secs(5),
        );
        (cmd_tx, actor, event_rx)
    }

    fn select(actor: &mut OrchestratorActor<FullCampus>, name: &str) -> Result<SelectOutcome, OrchestratorError> {
        let (tx, mut rx) = oneshot::channel();
        let flow = actor.handle_command(OrchestratorCommand::Select {
            class: ClassName::new(name),
            respond_to: tx,
        });
        assert!(flow.is_continue());
        rx.try_recv().unwrap()
    }

    #[tokio::test]
    async fn test_select_spawns_one_daemon() {
        let (_, mut actor, mut events) = create_actor();

        let outcome = select(&mut actor, "CS101").unwrap();
        assert!(matches!(outcome, SelectOutcome::Started(_)));
        assert_eq!(actor.daemon_count(), 1);

        let event = events.try_recv().unwrap();
        assert_eq!(
            event,
            EnrollEvent::SelectionStarted {
                class: ClassName::new("CS101")
            }
        );
    }

    #[tokio::test]
    async fn test_select_twice_keeps_single_daemon() {
        let (_, mut actor, _) = create_actor();

        let first = select(&mut actor, "CS101").unwrap();
        let second = select(&mut actor, "CS101").unwrap();

        assert_eq!(second, SelectOutcome::AlreadyActive(first.daemon_id()));
        assert_eq!(actor.daemon_count(), 1);
        assert_eq!(actor.selection.selections().len(), 1);
    }

    #[tokio::test]
    async fn test_select_unknown_class() {
        let (_, mut actor, _) = create_actor();

        let err = select(&mut actor, "PH100").unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Domain(DomainError::ClassNotFound { .. })
        ));
        assert_eq!(actor.daemon_count(), 0);
        assert!(actor.selection.selections().is_empty());
    }

    #[tokio::test]
    async fn test_remove_cancels_daemon() {
        let (_, mut actor, _) = create_actor();
        select(&mut actor, "CS101").unwrap();

        assert!(actor.handle_remove(&ClassName::new("CS101")));
        assert_eq!(actor.daemon_count(), 0);
        assert!(actor.selection.selections().is_empty());

        assert!(!actor.handle_remove(&ClassName::new("CS101")), "second remove is a no-op");
    }

    #[tokio::test]
    async fn test_change_sector_cancels_everything() {
        let (_, mut actor, mut events) = create_actor();
        select(&mut actor, "CS101").unwrap();
        select(&mut actor, "MA201").unwrap();
        while events.try_recv().is_ok() {}

        actor
            .handle_change_sector(&SectorName::new("Elective Pool B"))
            .unwrap();

        assert_eq!(actor.daemon_count(), 0);
        assert!(actor.selection.selections().is_empty());

        match events.try_recv().unwrap() {
            EnrollEvent::SelectionCleared { classes } => assert_eq!(classes.len(), 2),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.try_recv().unwrap() {
            EnrollEvent::ResultsUpdated { sector, results, .. } => {
                assert_eq!(sector, Some(SectorName::new("Elective Pool B")));
                assert_eq!(results.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_change_to_unknown_sector_changes_nothing() {
        let (_, mut actor, _) = create_actor();
        select(&mut actor, "CS101").unwrap();

        let err = actor
            .handle_change_sector(&SectorName::new("Nope"))
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Domain(DomainError::SectorNotFound { .. })
        ));
        assert_eq!(actor.daemon_count(), 1);
        assert_eq!(actor.selection.selections().len(), 1);
    }

    #[tokio::test]
    async fn test_report_marks_registered() {
        let (_, mut actor, mut events) = create_actor();
        let id = select(&mut actor, "CS101").unwrap().daemon_id();
        while events.try_recv().is_ok() {}

        actor.handle_report(DaemonReport {
            id,
            class: ClassName::new("CS101"),
            outcome: DaemonOutcome::Succeeded,
        });

        assert_eq!(actor.daemon_count(), 0);
        assert_eq!(
            actor
                .selection
                .selection(&ClassName::new("CS101"))
                .map(|e| e.status.clone()),
            Some(SelectionStatus::Registered)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            EnrollEvent::SelectionFinished {
                class: ClassName::new("CS101")
            }
        );
    }

    #[tokio::test]
    async fn test_stale_report_is_ignored() {
        let (_, mut actor, _) = create_actor();
        let first = select(&mut actor, "CS101").unwrap().daemon_id();
        actor.handle_remove(&ClassName::new("CS101"));
        let second = select(&mut actor, "CS101").unwrap().daemon_id();
        assert_ne!(first, second);

        actor.handle_report(DaemonReport {
            id: first,
            class: ClassName::new("CS101"),
            outcome: DaemonOutcome::Succeeded,
        });

        assert_eq!(actor.daemon_count(), 1);
        assert_eq!(
            actor
                .selection
                .selection(&ClassName::new("CS101"))
                .map(|e| e.status.clone()),
            Some(SelectionStatus::Registering)
        );
    }

    #[tokio::test]
    async fn test_failed_report_surfaces_reason() {
        let (_, mut actor, mut events) = create_actor();
        let id = select(&mut actor, "MA201").unwrap().daemon_id();
        while events.try_recv().is_ok() {}

        actor.handle_report(DaemonReport {
            id,
            class: ClassName::new("MA201"),
            outcome: DaemonOutcome::Failed(RegisterError::Rejected("time conflict".into())),
        });

        assert_eq!(actor.daemon_count(), 0);
        match events.try_recv().unwrap() {
            EnrollEvent::SelectionFailed { class, reason } => {
                assert_eq!(class.as_str(), "MA201");
                assert!(reason.contains("time conflict"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_publishes_results() {
        let (_, mut actor, mut events) = create_actor();

        let results = actor.handle_search("MA".to_string());
        assert_eq!(results.len(), 1);

        match events.try_recv().unwrap() {
            EnrollEvent::ResultsUpdated { keyword, results, .. } => {
                assert_eq!(keyword, "MA");
                assert_eq!(results.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_command_stops_loop_and_cancels_daemons() {
        let (_, mut actor, _) = create_actor();
        select(&mut actor, "CS101").unwrap();
        select(&mut actor, "MA201").unwrap();

        let (tx, mut rx) = oneshot::channel();
        let flow = actor.handle_command(OrchestratorCommand::Shutdown { respond_to: tx });

        assert!(flow.is_break());
        assert!(rx.try_recv().is_ok());
        assert_eq!(actor.daemon_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_lists_active_daemons() {
        let (_, mut actor, _) = create_actor();
        select(&mut actor, "MA201").unwrap();
        select(&mut actor, "CS101").unwrap();

        let snapshot = actor.snapshot();
        assert_eq!(
            snapshot.active_daemons,
            vec![ClassName::new("CS101"), ClassName::new("MA201")]
        );
        assert_eq!(snapshot.view.selections.len(), 2);
    }
}
