//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

use crate::command::Command;
use crate::types::Reply;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed MAIL or RCPT argument.
    #[error("{message} ({command})")]
    CommandArg {
        /// Description of what went wrong.
        message: String,
        /// The offending command, as it was received.
        command: Command,
    },

    /// Server rejected the dialog in a way that cannot be recovered from.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 554).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or unparseable response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The connection task is gone.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Creates an argument error for a raw command.
    #[must_use]
    pub fn command_arg(message: impl Into<String>, command: Command) -> Self {
        Self::CommandArg {
            message: message.into(),
            command,
        }
    }

    /// Escalates a rejected reply into a terminal error.
    #[must_use]
    pub fn from_reply(reply: &Reply) -> Self {
        match reply.code() {
            Some(code) => Self::smtp_error(code.as_u16(), reply.message()),
            None => Self::Protocol(format!("Invalid reply: {reply}")),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}
