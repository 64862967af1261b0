//! Registration daemons - one cancellable retry task per picked class.
//!
//! A daemon keeps trying to register its class on a fixed interval until the
//! campus system confirms the seat, a non-recoverable error occurs, or its
//! cancellation token fires. It never touches selection state: the only
//! things it shares with the orchestrator are the cancellation token, a
//! `watch` channel carrying its status, and at most one [`DaemonReport`].
//!
//! # State Machine
//!
//! ```text
//! Pending ──▶ Retrying ──┬──▶ Succeeded   (report: Succeeded)
//!               │  ▲     ├──▶ Failed      (report: Failed)
//!               └──┘     └──▶ Cancelled   (no report)
//!          capacity exceeded
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Report send failures (orchestrator gone) are logged, not propagated

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use enroll_core::{CampusClient, ClassName, RegisterError};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wait between two register attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// Identity and Status
// ============================================================================

/// Identifies one daemon instance.
///
/// Re-selecting a class spawns a new daemon with a new id, which lets the
/// orchestrator tell a late report from a replaced daemon apart from the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DaemonId(u64);

impl DaemonId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for DaemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a registration daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    /// Spawned, not yet running.
    Pending,

    /// Checking and retrying on every interval.
    Retrying,

    /// Registration confirmed by the campus system.
    Succeeded,

    /// Stopped by its cancellation token.
    Cancelled,

    /// Stopped on a non-recoverable error.
    Failed,
}

impl DaemonState {
    /// Returns true for states the daemon never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

/// Observable status of a daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,

    /// Register attempts made so far.
    pub attempts: u32,
}

impl DaemonStatus {
    fn pending() -> Self {
        Self {
            state: DaemonState::Pending,
            attempts: 0,
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// How a daemon finished, when it finished on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonOutcome {
    /// The campus system confirmed the registration.
    Succeeded,

    /// Registration failed for a reason other than capacity.
    Failed(RegisterError),
}

/// Completion message sent to the orchestrator.
///
/// A daemon sends at most one report and never sends one when cancelled.
#[derive(Debug, Clone)]
pub struct DaemonReport {
    pub id: DaemonId,
    pub class: ClassName,
    pub outcome: DaemonOutcome,
}

// ============================================================================
// Daemon Handle
// ============================================================================

/// Supervisor-side handle of a running daemon.
///
/// Dropping the handle does not stop the daemon; call [`DaemonHandle::cancel`].
#[derive(Debug)]
pub struct DaemonHandle {
    id: DaemonId,
    class: ClassName,
    cancel: CancellationToken,
    status: watch::Receiver<DaemonStatus>,
    task: JoinHandle<DaemonState>,
}

impl DaemonHandle {
    pub fn id(&self) -> DaemonId {
        self.id
    }

    /// Latest published status.
    pub fn status(&self) -> DaemonStatus {
        *self.status.borrow()
    }

    /// Signals the daemon to stop before its next attempt.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for the daemon to exit and returns its terminal state.
    ///
    /// A daemon task that panicked is reported as `Failed`.
    pub async fn join(self) -> DaemonState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                warn!(daemon_id = %self.id, class = %self.class, error = %e, "Registration daemon task aborted");
                DaemonState::Failed
            }
        }
    }
}

// ============================================================================
// Registration Daemon
// ============================================================================

/// Retry worker for a single class.
pub struct RegistrationDaemon<C> {
    id: DaemonId,
    class: ClassName,
    client: Arc<C>,
    interval: Duration,
    cancel: CancellationToken,
    status: watch::Sender<DaemonStatus>,
    reports: mpsc::Sender<DaemonReport>,
    attempts: u32,
}

impl<C: CampusClient> RegistrationDaemon<C> {
    /// Spawns a daemon for `class` on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `id` - Identity of this daemon instance
    /// * `class` - Class to register
    /// * `client` - Campus client shared with other daemons
    /// * `interval` - Wait before every register attempt
    /// * `reports` - Channel for the completion report
    pub fn spawn(
        id: DaemonId,
        class: ClassName,
        client: Arc<C>,
        interval: Duration,
        reports: mpsc::Sender<DaemonReport>,
    ) -> DaemonHandle {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(DaemonStatus::pending());

        let daemon = Self {
            id,
            class: class.clone(),
            client,
            interval,
            cancel: cancel.clone(),
            status: status_tx,
            reports,
            attempts: 0,
        };
        let task = tokio::spawn(daemon.run());

        DaemonHandle {
            id,
            class,
            cancel,
            status: status_rx,
            task,
        }
    }

    async fn run(mut self) -> DaemonState {
        info!(daemon_id = %self.id, class = %self.class, "Registration daemon started");
        self.publish(DaemonState::Retrying);

        let outcome = self.retry_until_done().await;

        let final_state = match &outcome {
            None => DaemonState::Cancelled,
            Some(DaemonOutcome::Succeeded) => DaemonState::Succeeded,
            Some(DaemonOutcome::Failed(_)) => DaemonState::Failed,
        };
        self.publish(final_state);

        if let Some(outcome) = outcome {
            let report = DaemonReport {
                id: self.id,
                class: self.class.clone(),
                outcome,
            };
            if self.reports.send(report).await.is_err() {
                debug!(daemon_id = %self.id, class = %self.class, "Orchestrator gone, report dropped");
            }
        }

        info!(
            daemon_id = %self.id,
            class = %self.class,
            state = ?final_state,
            attempts = self.attempts,
            "Registration daemon exited"
        );
        final_state
    }

    /// The retry loop. Returns `None` when cancelled.
    async fn retry_until_done(&mut self) -> Option<DaemonOutcome> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            match self.client.is_registered(&self.class).await {
                Ok(true) => {
                    info!(class = %self.class, "Already registered");
                    return Some(DaemonOutcome::Succeeded);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(class = %self.class, error = %e, "Registration status query failed");
                    return Some(DaemonOutcome::Failed(e.into()));
                }
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return None,

                _ = sleep(self.interval) => {}
            }

            self.attempts += 1;
            self.publish(DaemonState::Retrying);
            debug!(class = %self.class, attempt = self.attempts, "Trying to register");

            let result = self.client.register(&self.class).await;

            // An attempt already in flight is never reported after cancel.
            if self.cancel.is_cancelled() {
                if result.is_ok() {
                    warn!(class = %self.class, "Registration completed after cancellation");
                }
                return None;
            }

            match result {
                Ok(()) => {
                    info!(class = %self.class, attempts = self.attempts, "Registration succeeded");
                    return Some(DaemonOutcome::Succeeded);
                }
                Err(e) if e.is_capacity_exceeded() => {
                    debug!(class = %self.class, attempt = self.attempts, "Class full, retrying");
                }
                Err(e) => {
                    warn!(class = %self.class, error = %e, "Registration failed");
                    return Some(DaemonOutcome::Failed(e));
                }
            }
        }
    }

    fn publish(&self, state: DaemonState) {
        self.status.send_replace(DaemonStatus {
            state,
            attempts: self.attempts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enroll_core::{CampusError, Sector};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Campus double that replays a fixed list of register results.
    struct Scripted {
        already_registered: bool,
        results: Mutex<VecDeque<Result<(), RegisterError>>>,
        register_calls: AtomicU32,
    }

    impl Scripted {
        fn new(results: Vec<Result<(), RegisterError>>) -> Arc<Self> {
            Arc::new(Self {
                already_registered: false,
                results: Mutex::new(results.into()),
                register_calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.register_calls.load(Ordering::SeqCst)
        }
    }

    impl CampusClient for Scripted {
        async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
            Ok(Vec::new())
        }

        async fn is_registered(&self, _class: &ClassName) -> Result<bool, CampusError> {
            Ok(self.already_registered)
        }

        async fn register(&self, _class: &ClassName) -> Result<(), RegisterError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RegisterError::CapacityExceeded))
        }
    }

    fn spawn(client: Arc<Scripted>) -> (DaemonHandle, mpsc::Receiver<DaemonReport>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = RegistrationDaemon::spawn(
            DaemonId::new(1),
            ClassName::new("CS101"),
            client,
            DEFAULT_RETRY_INTERVAL,
            tx,
        );
        (handle, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_through_capacity_then_succeeds() {
        let client = Scripted::new(vec![
            Err(RegisterError::CapacityExceeded),
            Err(RegisterError::CapacityExceeded),
            Ok(()),
        ]);
        let (handle, mut reports) = spawn(Arc::clone(&client));

        sleep(DEFAULT_RETRY_INTERVAL * 2 + Duration::from_millis(10)).await;
        assert_eq!(
            handle.status(),
            DaemonStatus {
                state: DaemonState::Retrying,
                attempts: 2
            }
        );

        assert_eq!(handle.join().await, DaemonState::Succeeded);
        assert_eq!(client.calls(), 3);

        let report = reports.recv().await.unwrap();
        assert_eq!(report.id, DaemonId::new(1));
        assert_eq!(report.class.as_str(), "CS101");
        assert_eq!(report.outcome, DaemonOutcome::Succeeded);
        assert!(reports.try_recv().is_err(), "exactly one report");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_one_interval_per_attempt() {
        let client = Scripted::new(vec![Err(RegisterError::CapacityExceeded), Ok(())]);
        let start = tokio::time::Instant::now();

        let (handle, _reports) = spawn(client);
        handle.join().await;

        assert!(start.elapsed() >= DEFAULT_RETRY_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_registered_skips_register() {
        let client = Arc::new(Scripted {
            already_registered: true,
            results: Mutex::new(VecDeque::new()),
            register_calls: AtomicU32::new(0),
        });
        let (handle, mut reports) = spawn(Arc::clone(&client));

        assert_eq!(handle.join().await, DaemonState::Succeeded);
        assert_eq!(client.calls(), 0);
        assert_eq!(reports.recv().await.unwrap().outcome, DaemonOutcome::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failure_is_fatal() {
        let client = Scripted::new(vec![
            Err(RegisterError::CapacityExceeded),
            Err(RegisterError::Rejected("time conflict".into())),
            Ok(()),
        ]);
        let (handle, mut reports) = spawn(Arc::clone(&client));

        assert_eq!(handle.join().await, DaemonState::Failed);
        assert_eq!(client.calls(), 2, "no attempt after the fatal error");

        let report = reports.recv().await.unwrap();
        assert_eq!(
            report.outcome,
            DaemonOutcome::Failed(RegisterError::Rejected("time conflict".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_without_report() {
        let client = Scripted::new(Vec::new());
        let (handle, mut reports) = spawn(Arc::clone(&client));

        // Let a couple of attempts happen.
        sleep(DEFAULT_RETRY_INTERVAL * 2 + Duration::from_millis(10)).await;
        assert_eq!(handle.status().state, DaemonState::Retrying);
        let attempts_before = client.calls();
        assert!(attempts_before >= 2);

        handle.cancel();
        assert_eq!(handle.join().await, DaemonState::Cancelled);
        assert_eq!(client.calls(), attempts_before);
        assert!(reports.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_attempt() {
        let client = Scripted::new(vec![Ok(())]);
        let (handle, mut reports) = spawn(Arc::clone(&client));

        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.join().await, DaemonState::Cancelled);
        assert_eq!(client.calls(), 0);
        assert!(reports.try_recv().is_err());
    }

    /// Campus double whose register call takes a while to answer.
    struct Slow {
        register_delay: Duration,
        register_calls: AtomicU32,
    }

    impl CampusClient for Slow {
        async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
            Ok(Vec::new())
        }

        async fn is_registered(&self, _class: &ClassName) -> Result<bool, CampusError> {
            Ok(false)
        }

        async fn register(&self, _class: &ClassName) -> Result<(), RegisterError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.register_delay).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_attempt_sends_no_report() {
        let client = Arc::new(Slow {
            register_delay: Duration::from_secs(3),
            register_calls: AtomicU32::new(0),
        });
        let (tx, mut reports) = mpsc::channel(8);
        let handle = RegistrationDaemon::spawn(
            DaemonId::new(1),
            ClassName::new("CS101"),
            Arc::clone(&client),
            DEFAULT_RETRY_INTERVAL,
            tx,
        );

        // The first attempt is still waiting on the campus system.
        sleep(DEFAULT_RETRY_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(client.register_calls.load(Ordering::SeqCst), 1);

        handle.cancel();
        assert_eq!(handle.join().await, DaemonState::Cancelled);
        assert_eq!(client.register_calls.load(Ordering::SeqCst), 1);
        assert!(reports.try_recv().is_err());
    }

    /// Campus double whose status query always fails.
    struct StatusDown;

    impl CampusClient for StatusDown {
        async fn list_sectors(&self) -> Result<Vec<Sector>, CampusError> {
            Ok(Vec::new())
        }

        async fn is_registered(&self, _class: &ClassName) -> Result<bool, CampusError> {
            Err(CampusError::Unavailable("timeout".into()))
        }

        async fn register(&self, _class: &ClassName) -> Result<(), RegisterError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_query_failure_is_fatal() {
        let (tx, mut reports) = mpsc::channel(8);
        let handle = RegistrationDaemon::spawn(
            DaemonId::new(1),
            ClassName::new("CS101"),
            Arc::new(StatusDown),
            DEFAULT_RETRY_INTERVAL,
            tx,
        );

        assert_eq!(handle.join().await, DaemonState::Failed);

        let report = reports.recv().await.unwrap();
        assert_eq!(
            report.outcome,
            DaemonOutcome::Failed(RegisterError::Campus(CampusError::Unavailable(
                "timeout".into()
            )))
        );
        assert!(reports.try_recv().is_err(), "exactly one report");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DaemonState::Pending.is_terminal());
        assert!(!DaemonState::Retrying.is_terminal());
        assert!(DaemonState::Succeeded.is_terminal());
        assert!(DaemonState::Cancelled.is_terminal());
        assert!(DaemonState::Failed.is_terminal());
    }

    #[test]
    fn test_daemon_id_display() {
        assert_eq!(DaemonId::new(7).to_string(), "#7");
    }
}
