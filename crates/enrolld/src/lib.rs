//! Enroll Engine - Registration daemons and the selection orchestrator
//!
//! This crate provides the core infrastructure of the enroll tool:
//! - `registration` - per-class retry daemons
//! - `orchestrator` - actor owning selection state and the daemon map
//! - `config` - layered engine configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         enrolld                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │OrchestratorHandle│───▶│     OrchestratorActor       │   │
//! │  │ (presentation)  │     │ (selection + daemon owner)  │   │
//! │  └─────────────────┘     └───────┬──────────────▲──────┘   │
//! │                                  │ spawn/cancel │ reports  │
//! │                                  ▼              │          │
//! │                          ┌──────────────────────┴──────┐   │
//! │                          │  RegistrationDaemon (per    │   │
//! │                          │  picked class, tokio task)  │   │
//! │                          └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod orchestrator;
pub mod registration;

pub use config::{ConfigError, EnrollConfig};
pub use orchestrator::{
    spawn_orchestrator, EnrollEvent, OrchestratorConfig, OrchestratorError, OrchestratorHandle,
    OrchestratorSnapshot, SelectOutcome,
};
pub use registration::{
    DaemonHandle, DaemonId, DaemonOutcome, DaemonReport, DaemonState, DaemonStatus,
    RegistrationDaemon, DEFAULT_RETRY_INTERVAL,
};
