//! Line commands editing the waypoint list, one per line of input.
//!
//! ```text
//! set 0 38.004697 23.800735
//! click 38.01 23.81
//! add
//! remove 1
//! swap
//! show
//! ```

use std::str::FromStr;

use shared::protocol::{CoordinateError, format_coordinate, parse_coordinate_text};
use shared::{Coordinate, WaypointRole, WaypointSource, WaypointStore};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::session::SessionEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Typed input for a slot. Invalid text clears the slot.
    Set { index: usize, text: String },
    Clear(usize),
    Click(Coordinate),
    Add,
    Remove(usize),
    Swap,
    Show,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("no waypoint {index} (there are {count})")]
    NoSuchSlot { index: usize, count: usize },
    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((line, ""));

        match name {
            "" => Err(CommandError::Empty),
            "set" => {
                let (index, text) = rest
                    .split_once(char::is_whitespace)
                    .unwrap_or((rest, ""));
                Ok(Command::Set {
                    index: parse_index(index, "set <index> <lat> <lon>")?,
                    text: text.trim().to_string(),
                })
            }
            "clear" => Ok(Command::Clear(parse_index(rest, "clear <index>")?)),
            "click" => Ok(Command::Click(parse_coordinate_text(rest)?)),
            "add" => no_arguments(rest, "add", Command::Add),
            "remove" => Ok(Command::Remove(parse_index(rest, "remove <index>")?)),
            "swap" => no_arguments(rest, "swap", Command::Swap),
            "show" => no_arguments(rest, "show", Command::Show),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_index(token: &str, usage: &'static str) -> Result<usize, CommandError> {
    token.parse().map_err(|_| CommandError::Usage(usage))
}

fn no_arguments(
    rest: &str,
    usage: &'static str,
    command: Command,
) -> Result<Command, CommandError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::Usage(usage))
    }
}

impl Command {
    /// Whether the command can change the route and needs a new query.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::Show)
    }

    pub fn apply(&self, store: &mut WaypointStore) -> Result<(), CommandError> {
        match self {
            Command::Set { index, text } => {
                check_index(store, *index)?;
                match parse_coordinate_text(text) {
                    Ok(coord) => {
                        store.set(*index, Some(coord));
                    }
                    Err(err) => {
                        tracing::warn!("waypoint {index} cleared: {err}");
                        store.clear(*index);
                    }
                }
            }
            Command::Clear(index) => {
                check_index(store, *index)?;
                store.clear(*index);
            }
            Command::Click(coord) => {
                let index = store.place(*coord);
                tracing::debug!("placed waypoint {index} at {}", format_coordinate(*coord));
            }
            Command::Add => {
                store.insert();
            }
            Command::Remove(index) => {
                check_index(store, *index)?;
                store.remove(*index);
            }
            Command::Swap => store.swap_all(),
            Command::Show => {}
        }
        Ok(())
    }
}

fn check_index(store: &WaypointStore, index: usize) -> Result<(), CommandError> {
    let count = store.count();
    if index < count {
        Ok(())
    } else {
        Err(CommandError::NoSuchSlot { index, count })
    }
}

/// One line per slot, e.g. `0 origin 38.0046970 23.8007350`.
pub fn render_slots(store: &WaypointStore) -> String {
    let mut lines = Vec::with_capacity(store.count());
    for index in 0..store.count() {
        let role = match store.role(index) {
            WaypointRole::Origin => "origin",
            WaypointRole::Via => "via",
            WaypointRole::Destination => "destination",
        };
        let value = store
            .get(index)
            .map(format_coordinate)
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("{index} {role} {value}"));
    }
    lines.join("\n")
}

/// Forwards input lines to a session until the input ends or the session
/// stops listening.
pub async fn forward_lines<R>(reader: R, commands: mpsc::Sender<String>) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if commands.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// Text printed on stdout for a session event, if any.
pub fn render_event(event: &SessionEvent, json: bool) -> Result<Option<String>, ClientError> {
    let text = match event {
        SessionEvent::Route(path) if json => serde_json::to_string(path)?,
        SessionEvent::Route(path) => {
            let mut lines = vec![format!("route {} points", path.len())];
            lines.extend(path.iter().map(|coord| format_coordinate(*coord)));
            lines.join("\n")
        }
        SessionEvent::ServerError(message) => message.clone(),
        SessionEvent::Slots(slots) => slots.clone(),
        SessionEvent::CommandFailed(err) => format!("error: {err}"),
        SessionEvent::Connected | SessionEvent::Disconnected | SessionEvent::Submitted(_) => {
            return Ok(None);
        }
    };
    Ok(Some(text))
}
