//! Operator commands read from stdin.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::app::AppHandle;

/// Export path used when `export` is given without one.
pub const DEFAULT_EXPORT_PATH: &str = "pulsewatch_export.json";

pub const HELP: &str = "commands: t|toggle  r|refresh  e|export [path]  q|quit  ?|help";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Refresh,
    Export(PathBuf),
    Quit,
    Help,
}

/// Whether the caller should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Option<Result<Command, String>> {
    let mut words = line.split_whitespace();
    let word = words.next()?;

    let command = match word {
        "t" | "toggle" => Command::Toggle,
        "r" | "refresh" => Command::Refresh,
        "e" | "export" => {
            let path = words.next().unwrap_or(DEFAULT_EXPORT_PATH);
            Command::Export(PathBuf::from(path))
        }
        "q" | "quit" | "exit" => Command::Quit,
        "?" | "h" | "help" => Command::Help,
        other => return Some(Err(format!("unknown command '{}'", other))),
    };

    if words.next().is_some() {
        return Some(Err(format!("too many arguments for '{}'", word)));
    }
    Some(Ok(command))
}

/// Handle a command against the running core.
pub fn handle_command(handle: &AppHandle, command: Command) -> Flow {
    match command {
        Command::Toggle => handle.toggle_mode(),
        Command::Refresh => handle.refresh_history(),
        Command::Export(path) => match handle.export_state(&path) {
            Ok(()) => info!(path = %path.display(), "exported snapshot"),
            Err(e) => warn!(path = %path.display(), "export failed: {}", e),
        },
        Command::Quit => return Flow::Quit,
        Command::Help => eprintln!("{}", HELP),
    }
    Flow::Continue
}

/// Parse and handle one line; parse errors are reported and ignored.
pub fn handle_line(handle: &AppHandle, line: &str) -> Flow {
    match parse_line(line) {
        None => Flow::Continue,
        Some(Ok(command)) => handle_command(handle, command),
        Some(Err(e)) => {
            warn!("{}", e);
            eprintln!("{}", HELP);
            Flow::Continue
        }
    }
}
