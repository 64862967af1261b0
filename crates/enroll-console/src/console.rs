//! The interactive console loop.
//!
//! Reads commands line by line and forwards them to the orchestrator while
//! rendering every event the orchestrator publishes. Both sources are
//! awaited in a single `select!`, so daemon completions are printed as soon
//! as they happen, even while the user is idle.
//!
//! Events are polled before input so that the consequences of one command
//! are printed before the next command runs.

use enroll_core::ClassName;
use enrolld::{DaemonStatus, EnrollEvent, OrchestratorError, OrchestratorHandle, SelectOutcome};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::input::{parse_command, Intent, HELP};
use crate::render::Renderer;

/// Whether the loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Console front-end bound to one orchestrator.
pub struct Console<R, W> {
    handle: OrchestratorHandle,
    renderer: Renderer,
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(handle: OrchestratorHandle, renderer: Renderer, lines: Lines<R>, out: W) -> Self {
        Self {
            handle,
            renderer,
            lines,
            out,
        }
    }

    /// Runs until `quit`, end of input, cancellation, or the orchestrator
    /// going away. The orchestrator is shut down on the way out, cancelling
    /// any registration still in progress.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut events = self.handle.subscribe();
        self.handle.refresh().await?;
        if let Some(text) = self.renderer.message("Type 'help' for a list of commands.") {
            self.emit(&text).await?;
        }

        let result = self.event_loop(&mut events, &cancel).await;

        let pending = self
            .handle
            .snapshot()
            .await
            .map(|s| s.active_daemons.len())
            .unwrap_or(0);
        self.handle.shutdown().await;
        info!(pending, "Console stopped");

        result
    }

    /// Gives back the output sink.
    pub fn into_writer(self) -> W {
        self.out
    }

    async fn event_loop(
        &mut self,
        events: &mut broadcast::Receiver<EnrollEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Console cancelled");
                    return Ok(());
                }

                event = events.recv() => match event {
                    Ok(event) => {
                        let text = self.renderer.event(&event)?;
                        self.emit(&text).await?;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Console lagged behind orchestrator events");
                        let text = self
                            .renderer
                            .error(&format!("missed {missed} updates, type 'status' to resync"));
                        self.emit(&text).await?;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Orchestrator event channel closed");
                        return Ok(());
                    }
                },

                line = self.lines.next_line() => match line? {
                    Some(line) => {
                        if self.handle_line(&line).await? == Flow::Quit {
                            info!("User requested quit");
                            return Ok(());
                        }
                    }
                    None => {
                        debug!("End of input");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let intent = match parse_command(line) {
            Ok(intent) => intent,
            Err(e) => {
                let text = self.renderer.error(&e.to_string());
                self.emit(&text).await?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?intent, "Console intent");

        match intent {
            Intent::None => {}
            Intent::Quit => return Ok(Flow::Quit),
            Intent::Help => {
                if let Some(text) = self.renderer.message(HELP) {
                    self.emit(&text).await?;
                }
            }
            // Results and cleared picks arrive as events.
            Intent::Sector(sector) => {
                if let Err(e) = self.handle.change_sector(sector).await {
                    self.user_error(e).await?;
                }
            }
            Intent::Search(keyword) => {
                self.handle.search(keyword).await?;
            }
            Intent::Select(class) => match self.handle.select(class.clone()).await {
                // Started is announced by the SelectionStarted event.
                Ok(SelectOutcome::Started(_)) => {}
                Ok(outcome) => {
                    let text = self.renderer.selected(&class, outcome)?;
                    self.emit(&text).await?;
                }
                Err(e) => self.user_error(e).await?,
            },
            Intent::Remove(class) => {
                if !self.handle.remove(class.clone()).await? {
                    let text = self.renderer.removed(&class, false)?;
                    self.emit(&text).await?;
                }
            }
            Intent::List => {
                let snapshot = self.handle.snapshot().await?;
                let view = &snapshot.view;
                let text = self
                    .renderer
                    .results(view.sector.as_ref(), &view.keyword, &view.results)?;
                self.emit(&text).await?;
            }
            Intent::Status => {
                let snapshot = self.handle.snapshot().await?;
                let daemons = self.daemon_statuses(&snapshot.active_daemons).await;
                let text = self.renderer.status(&snapshot, &daemons)?;
                self.emit(&text).await?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn daemon_statuses(&self, classes: &[ClassName]) -> Vec<(ClassName, DaemonStatus)> {
        let mut statuses = Vec::with_capacity(classes.len());
        for class in classes {
            // A daemon may finish between the snapshot and this query.
            if let Some(status) = self.handle.daemon_status(class.clone()).await {
                statuses.push((class.clone(), status));
            }
        }
        statuses
    }

    /// Prints domain errors and keeps going; anything else is fatal.
    async fn user_error(&mut self, error: OrchestratorError) -> Result<()> {
        match error {
            OrchestratorError::Domain(e) => {
                let text = self.renderer.error(&e.to_string());
                self.emit(&text).await
            }
            other => Err(other.into()),
        }
    }

    async fn emit(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}
