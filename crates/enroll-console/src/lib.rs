//! Enroll Console - Line-oriented front-end
//!
//! This library provides the interactive side of the enroll tool:
//! - `login` - credential prompt loop against an `Authenticator`
//! - `input` - line command parsing into intents
//! - `render` - text and JSON-lines rendering of events and replies
//! - `console` - the loop tying user input and orchestrator events together
//!
//! The console holds only an `OrchestratorHandle`; all selection state lives
//! in the orchestrator actor.

pub mod console;
pub mod error;
pub mod input;
pub mod login;
pub mod render;

// Re-export commonly used types
pub use console::Console;
pub use error::{ConsoleError, Result};
pub use input::{parse_command, InputError, Intent};
pub use login::login;
pub use render::{OutputFormat, Renderer};
