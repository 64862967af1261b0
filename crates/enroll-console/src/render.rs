//! Turns orchestrator events and replies into console output.
//!
//! Text output is meant for people; JSON output (`--json`) writes one
//! object per line for scripts. Events keep their `"event"` tag, replies to
//! commands carry a `"reply"` tag, and user-facing errors an `"error"` key.

use enroll_core::{CandidateClass, ClassName, SectorName, SelectionEntry, SelectionStatus};
use enrolld::{DaemonStatus, EnrollEvent, OrchestratorSnapshot, SelectOutcome};
use serde_json::json;

use crate::error::Result;

/// How the console writes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Renders console output in one [`OutputFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn event(&self, event: &EnrollEvent) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string(event)?);
        }

        Ok(match event {
            EnrollEvent::SectorsAvailable { sectors } => sectors_text(sectors),
            EnrollEvent::ResultsUpdated {
                sector,
                keyword,
                results,
            } => results_text(sector.as_ref(), keyword, results),
            EnrollEvent::SelectionStarted { class } => {
                format!("[{class}] registering...")
            }
            EnrollEvent::SelectionFinished { class } => format!("[{class}] registered"),
            EnrollEvent::SelectionFailed { class, reason } => {
                format!("[{class}] registration failed: {reason}")
            }
            EnrollEvent::SelectionRemoved { class } => format!("[{class}] removed"),
            EnrollEvent::SelectionCleared { classes } if classes.is_empty() => {
                "Selections cleared".to_string()
            }
            EnrollEvent::SelectionCleared { classes } => {
                format!("Selections cleared: {}", join(classes))
            }
        })
    }

    // ========================================================================
    // Command Replies
    // ========================================================================

    pub fn selected(&self, class: &ClassName, outcome: SelectOutcome) -> Result<String> {
        let (label, id) = match outcome {
            SelectOutcome::Started(id) => ("started", id),
            SelectOutcome::AlreadyActive(id) => ("already_active", id),
        };
        match self.format {
            OutputFormat::Json => Ok(json!({
                "reply": "select",
                "class": class,
                "outcome": label,
                "daemon_id": id,
            })
            .to_string()),
            OutputFormat::Text => Ok(match outcome {
                SelectOutcome::Started(_) => format!("Selected {class} (daemon {id})"),
                SelectOutcome::AlreadyActive(_) => {
                    format!("{class} is already registering (daemon {id})")
                }
            }),
        }
    }

    pub fn removed(&self, class: &ClassName, removed: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(json!({
                "reply": "remove",
                "class": class,
                "removed": removed,
            })
            .to_string()),
            OutputFormat::Text if removed => Ok(format!("Removed {class}")),
            OutputFormat::Text => Ok(format!("{class} was not selected")),
        }
    }

    pub fn results(
        &self,
        sector: Option<&SectorName>,
        keyword: &str,
        results: &[CandidateClass],
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(json!({
                "reply": "list",
                "sector": sector,
                "keyword": keyword,
                "results": results,
            })
            .to_string()),
            OutputFormat::Text => Ok(results_text(sector, keyword, results)),
        }
    }

    /// Full status: sectors, picks and the progress of every daemon.
    ///
    /// `daemons` pairs each active class with its last known status.
    pub fn status(
        &self,
        snapshot: &OrchestratorSnapshot,
        daemons: &[(ClassName, DaemonStatus)],
    ) -> Result<String> {
        if self.format == OutputFormat::Json {
            let daemons: Vec<_> = daemons
                .iter()
                .map(|(class, status)| json!({ "class": class, "state": status.state, "attempts": status.attempts }))
                .collect();
            return Ok(json!({
                "reply": "status",
                "snapshot": snapshot,
                "daemons": daemons,
            })
            .to_string());
        }

        let view = &snapshot.view;
        let mut out = sectors_text(&view.sectors);
        match &view.sector {
            Some(sector) => out.push_str(&format!("\nCurrent sector: {sector}")),
            None => out.push_str("\nCurrent sector: (none)"),
        }
        if !view.keyword.is_empty() {
            out.push_str(&format!("\nKeyword: {}", view.keyword));
        }

        if view.selections.is_empty() {
            out.push_str("\nNo classes selected");
        } else {
            out.push_str("\nSelected:");
            for entry in &view.selections {
                let attempts = daemons
                    .iter()
                    .find(|(class, _)| class == entry.name())
                    .map(|(_, status)| status.attempts);
                out.push('\n');
                out.push_str(&selection_line(entry, attempts));
            }
        }
        Ok(out)
    }

    /// A problem the user can fix; the console keeps running.
    pub fn error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => json!({ "error": message }).to_string(),
            OutputFormat::Text => format!("error: {message}"),
        }
    }

    /// Plain informational text. Suppressed in JSON mode.
    pub fn message(&self, text: &str) -> Option<String> {
        match self.format {
            OutputFormat::Json => None,
            OutputFormat::Text => Some(text.to_string()),
        }
    }
}

// ============================================================================
// Text Helpers
// ============================================================================

fn join(classes: &[ClassName]) -> String {
    classes
        .iter()
        .map(ClassName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn sectors_text(sectors: &[SectorName]) -> String {
    let names: Vec<_> = sectors.iter().map(|s| s.as_str()).collect();
    format!("Sectors: {}", names.join(" | "))
}

fn results_text(sector: Option<&SectorName>, keyword: &str, results: &[CandidateClass]) -> String {
    let sector = sector.map_or("(none)", SectorName::as_str);
    let mut out = if keyword.is_empty() {
        format!("{sector}: {} classes", results.len())
    } else {
        format!("{sector} matching '{keyword}': {} classes", results.len())
    };
    for class in results {
        out.push_str(&format!("\n  {class}"));
    }
    out
}

fn selection_line(entry: &SelectionEntry, attempts: Option<u32>) -> String {
    let detail = match (&entry.status, attempts) {
        (SelectionStatus::Registering, Some(n)) => format!(" ({n} attempts)"),
        (SelectionStatus::Failed { reason }, _) => format!(": {reason}"),
        _ => String::new(),
    };
    format!(
        "  {} [{}] {}{detail}",
        entry.class.name,
        entry.class.section,
        entry.status.label()
    )
}

// ============================================================================
// Tests
// ============================================================================
