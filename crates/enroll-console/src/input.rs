//! Line command parsing for the enroll console.
//!
//! Each line the user types becomes an [`Intent`] that the console loop
//! turns into an orchestrator call.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use enroll_core::{ClassName, SectorName};
use thiserror::Error;

// ============================================================================
// Intent Types
// ============================================================================

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Blank line.
    None,

    /// Switch to the sector with this exact name.
    Sector(SectorName),

    /// Replace the search keyword. Empty shows the whole sector.
    Search(String),

    /// Pick a class and start registering it.
    Select(ClassName),

    /// Drop a pick.
    Remove(ClassName),

    /// Show the current search results.
    List,

    /// Show sectors, picks and their daemons.
    Status,

    /// Show the command reference.
    Help,

    /// Leave the console.
    Quit,
}

/// A line that is not a valid command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),

    #[error("'{command}' needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

/// Command reference printed by `help`.
pub const HELP: &str = "\
Commands:
  sector <name>     switch sector (cancels every pending registration)
  search [keyword]  filter classes of the current sector by name or section
  select <class>    pick a class and keep trying to register it
  remove <class>    drop a pick and stop its registration
  list              show the current search results
  status            show sectors, picks and registration progress
  help              show this message
  quit              leave (pending registrations are cancelled)";

// ============================================================================
// Parser
// ============================================================================

/// Parses one input line.
///
/// The first word is the command, case-insensitive. Everything after it,
/// trimmed, is the argument, so sector names may contain spaces.
///
/// # Examples
///
/// ```
/// use enroll_console::input::{parse_command, Intent};
///
/// assert_eq!(parse_command("quit").unwrap(), Intent::Quit);
/// assert_eq!(parse_command("search CS").unwrap(), Intent::Search("CS".into()));
/// ```
pub fn parse_command(line: &str) -> Result<Intent, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Intent::None);
    }

    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "sector" | "sec" => required(argument, "sector", "sector name")
            .map(|name| Intent::Sector(SectorName::new(name))),
        "search" | "find" | "/" => Ok(Intent::Search(argument.to_string())),
        "select" | "add" | "pick" => required(argument, "select", "class name")
            .map(|name| Intent::Select(ClassName::new(name))),
        "remove" | "rm" | "drop" => required(argument, "remove", "class name")
            .map(|name| Intent::Remove(ClassName::new(name))),
        "list" | "ls" => Ok(Intent::List),
        "status" | "st" => Ok(Intent::Status),
        "help" | "?" | "h" => Ok(Intent::Help),
        "quit" | "exit" | "q" => Ok(Intent::Quit),
        _ => Err(InputError::UnknownCommand(command.to_string())),
    }
}

fn required<'a>(
    argument: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, InputError> {
    if argument.is_empty() {
        Err(InputError::MissingArgument {
            command,
            argument: what,
        })
    } else {
        Ok(argument)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_is_no_intent() {
        assert_eq!(parse_command("").unwrap(), Intent::None);
        assert_eq!(parse_command("   \t").unwrap(), Intent::None);
    }

    #[test]
    fn test_sector_name_keeps_inner_spaces() {
        assert_eq!(
            parse_command("  sector   Elective Pool B  ").unwrap(),
            Intent::Sector(SectorName::new("Elective Pool B"))
        );
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(
            parse_command("SELECT CS101").unwrap(),
            Intent::Select(ClassName::new("CS101"))
        );
        assert_eq!(parse_command("Quit").unwrap(), Intent::Quit);
    }

    #[test]
    fn test_arguments_keep_their_case() {
        assert_eq!(
            parse_command("remove cs101").unwrap(),
            Intent::Remove(ClassName::new("cs101"))
        );
    }

    #[test]
    fn test_search_without_keyword_clears_filter() {
        assert_eq!(parse_command("search").unwrap(), Intent::Search(String::new()));
        assert_eq!(
            parse_command("/ Morning").unwrap(),
            Intent::Search("Morning".to_string())
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(parse_command("ls").unwrap(), Intent::List);
        assert_eq!(parse_command("st").unwrap(), Intent::Status);
        assert_eq!(parse_command("?").unwrap(), Intent::Help);
        assert_eq!(parse_command("exit").unwrap(), Intent::Quit);
        assert_eq!(
            parse_command("add MA201").unwrap(),
            Intent::Select(ClassName::new("MA201"))
        );
    }

    #[test]
    fn test_missing_argument() {
        let err = parse_command("select").unwrap_err();
        assert_eq!(
            err,
            InputError::MissingArgument {
                command: "select",
                argument: "class name"
            }
        );
        assert_eq!(err.to_string(), "'select' needs a class name");

        assert!(matches!(
            parse_command("sector  ").unwrap_err(),
            InputError::MissingArgument { command: "sector", .. }
        ));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_command("enrol CS101").unwrap_err();
        assert_eq!(err, InputError::UnknownCommand("enrol".to_string()));
        assert!(err.to_string().contains("help"));
    }
}
