//! Command stream parser.
//!
//! Parses what a client sends, including the message body after `DATA`.
//! The body is scanned for the terminating `.` line without ever rescanning
//! bytes that were already examined.

use std::sync::LazyLock;

use regex::Regex;

use super::line::LineBuffer;
use crate::command::Command;

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z]+)(?:[ \t]+(.*))?\s*$").unwrap_or_else(|e| unreachable!("command pattern is valid: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Command,
    /// Collecting message data. `cursor` is where the next LF search starts.
    Data { cursor: usize },
}

/// Outcome of a terminator scan.
#[derive(Debug, PartialEq, Eq)]
enum Scan {
    /// Body ends at `data_end`; `consumed` includes the terminator.
    Found { data_end: usize, consumed: usize },
    /// No terminator yet; resume from this offset.
    Pending(usize),
}

/// Incremental parser for client commands.
#[derive(Debug)]
pub struct CommandParser {
    lines: LineBuffer,
    mode: Mode,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    /// Creates a parser in command mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LineBuffer::default(),
            mode: Mode::Command,
        }
    }

    /// Feeds received bytes and returns every command they complete.
    ///
    /// After a `DATA` command the parser switches to data mode; the body is
    /// returned as one [`Command::SendData`] once its terminator arrives.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Command> {
        self.lines.extend(data);
        let mut commands = Vec::new();
        loop {
            match self.mode {
                Mode::Command => {
                    let Some(line) = self.lines.next_line() else { break };
                    let cmd = parse_line(line);
                    if cmd == Command::Data {
                        self.mode = Mode::Data { cursor: 0 };
                    }
                    commands.push(cmd);
                }
                Mode::Data { cursor } => match scan_terminator(self.lines.as_bytes(), cursor) {
                    Scan::Found { data_end, consumed } => {
                        let mut body = self.lines.take(consumed);
                        body.truncate(data_end);
                        commands.push(Command::SendData { data: body.freeze() });
                        self.mode = Mode::Command;
                    }
                    Scan::Pending(cursor) => {
                        self.mode = Mode::Data { cursor };
                        break;
                    }
                },
            }
        }
        commands
    }

    /// Returns the bytes not yet turned into a command.
    #[must_use]
    pub fn remainder(&self) -> &[u8] {
        self.lines.as_bytes()
    }

    /// Returns true while a message body is being collected.
    #[must_use]
    pub const fn in_data(&self) -> bool {
        matches!(self.mode, Mode::Data { .. })
    }
}

/// Parses a complete buffer of commands.
///
/// Returns the commands and the bytes that did not complete one.
#[must_use]
pub fn parse_commands(data: &[u8]) -> (Vec<Command>, Vec<u8>) {
    let mut parser = CommandParser::new();
    let commands = parser.feed(data);
    (commands, parser.remainder().to_vec())
}

fn parse_line(line: String) -> Command {
    let parsed = COMMAND_RE.captures(&line).map(|caps| {
        let verb = caps.get(1).map_or("", |m| m.as_str());
        Command::from_parts(verb, caps.get(2).map(|m| m.as_str()))
    });
    match parsed {
        Some(Ok(cmd)) => cmd,
        Some(Err(err)) => {
            tracing::debug!(%err, "rejecting command argument");
            Command::InvalidSyntax { line }
        }
        None => Command::InvalidSyntax { line },
    }
}

/// Looks for a `.` line at `at`.
///
/// `None` means there are not enough bytes to tell; `Some(0)` means the line
/// is not a terminator; otherwise the terminator length is returned.
fn dot_line(buf: &[u8], at: usize) -> Option<usize> {
    match buf.get(at..)? {
        [] | [b'.'] | [b'.', b'\r'] => None,
        [b'.', b'\n', ..] => Some(2),
        [b'.', b'\r', b'\n', ..] => Some(3),
        _ => Some(0),
    }
}

fn scan_terminator(buf: &[u8], cursor: usize) -> Scan {
    if cursor == 0 {
        match dot_line(buf, 0) {
            None => return Scan::Pending(0),
            Some(0) => {}
            Some(len) => return Scan::Found { data_end: 0, consumed: len },
        }
    }

    let mut from = cursor;
    while let Some(offset) = buf[from..].iter().position(|&b| b == b'\n') {
        let lf = from + offset;
        match dot_line(buf, lf + 1) {
            None => return Scan::Pending(lf),
            Some(0) => from = lf + 1,
            Some(len) => {
                let data_end = if lf > 0 && buf[lf - 1] == b'\r' { lf - 1 } else { lf };
                return Scan::Found {
                    data_end,
                    consumed: lf + 1 + len,
                };
            }
        }
    }
    Scan::Pending(buf.len())
}
