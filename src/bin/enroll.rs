//! enroll - keep trying to register course sections until a seat opens
//!
//! This binary logs in to the campus system, lets the user browse sectors
//! and pick classes on a line console, and runs one registration daemon per
//! picked class in the background.
//!
//! # Usage
//!
//! ```text
//! enroll --catalog demos/catalog.toml            # prompt for username and password
//! enroll --catalog demos/catalog.toml -u student # prompt for the password only
//! enroll --json                                  # JSON lines on stdout
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use enroll_catalog::{Catalog, StaticCampus};
use enroll_console::{login, Console, ConsoleError, OutputFormat, Renderer};
use enrolld::{spawn_orchestrator, EnrollConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Arguments
// ============================================================================

/// enroll - course section registration assistant
#[derive(Parser, Debug)]
#[command(name = "enroll")]
#[command(about = "Keep retrying course registrations until a seat opens")]
#[command(version)]
struct Args {
    /// Config file (default: <config_dir>/enroll/config.toml if present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Offline campus catalog (overrides config and ENROLL_CATALOG)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seconds between two registration attempts
    #[arg(long, value_name = "SECS")]
    retry_interval: Option<u64>,

    /// Username; only the password is prompted for
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Write events and replies as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Applies command-line overrides on top of file and environment values.
    fn apply(&self, config: &mut EnrollConfig) {
        if let Some(catalog) = &self.catalog {
            config.catalog = Some(catalog.clone());
        }
        if let Some(secs) = self.retry_interval {
            config.retry_interval_secs = secs;
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

/// `<state_dir>/enroll`, falling back to the local data dir on platforms
/// without a state dir.
fn get_log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("enroll"))
}

/// Opens the log file in append mode, creating its directory.
///
/// Returns `None` if any step fails; logging then goes to stderr.
fn create_log_file() -> Option<fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("enroll.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

/// Logs go to a file so they do not interleave with console output.
/// `RUST_LOG` adds to the default `info` directives.
fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["enroll=info", "enrolld=info", "enroll_console=info", "enroll_catalog=info"] {
        filter = filter.add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| Directive::from(tracing::Level::INFO)),
        );
    }

    match create_log_file() {
        Some(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // 0. Parse CLI arguments
    let args = Args::parse();

    // 1. Initialize logging
    init_logging();

    // 2. Load configuration: defaults, file, environment, then flags
    let mut config =
        EnrollConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    info!(
        retry_interval_secs = config.retry_interval_secs,
        catalog = ?config.catalog,
        json = args.json,
        "enroll starting"
    );

    // 3. Open the campus
    let Some(catalog_path) = config.catalog.clone() else {
        bail!("No campus catalog configured: pass --catalog or set ENROLL_CATALOG");
    };
    let catalog = Catalog::from_file(&catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    let campus = StaticCampus::new(catalog);

    // 4. Log in; prompts go to stderr so stdout carries only console output
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut prompt = tokio::io::stderr();
    let session = match login(&campus, &mut lines, &mut prompt, args.user.as_deref()).await {
        Ok(session) => session,
        Err(ConsoleError::LoginCancelled) => {
            info!("Login cancelled");
            return Ok(());
        }
        Err(e) => return Err(e).context("Login failed"),
    };

    // 5. Start the orchestrator
    let handle = spawn_orchestrator(Arc::new(session), config.orchestrator())
        .await
        .context("Failed to start the orchestrator")?;

    // 6. Ctrl+C cancels the console, which cancels every daemon
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    // 7. Run the console until quit, end of input or Ctrl+C
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let mut console = Console::new(handle, Renderer::new(format), lines, tokio::io::stdout());
    console.run(cancel_token).await.context("Console failed")?;

    info!("enroll stopped");
    Ok(())
}
