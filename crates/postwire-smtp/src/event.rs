//! Events delivered to the owner of a connection.

use crate::command::Command;
use crate::error::Error;
use crate::session::MessageOutcome;
use crate::types::Reply;

/// Something that happened on a connection.
#[derive(Debug)]
pub enum Event {
    /// The transport is ready; emitted once, before anything else.
    Connect,
    /// A reply arrived for the given command.
    Reply {
        /// The server's reply.
        reply: Reply,
        /// The command it answers.
        command: Command,
    },
    /// Every sent command has been answered.
    Drain,
    /// A message reached its final state.
    Message(MessageOutcome),
    /// The dialog failed in a way that ends the session.
    Error(Error),
    /// The connection is finished; emitted at most once, always last.
    End,
}

impl Event {
    /// Returns the message outcome, if this is a message event.
    #[must_use]
    pub const fn as_message(&self) -> Option<&MessageOutcome> {
        match self {
            Self::Message(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Returns true for the terminal event.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}
