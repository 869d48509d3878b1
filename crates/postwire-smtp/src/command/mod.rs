//! SMTP commands.
//!
//! [`Command`] is a closed set of variants. Serialization and the pipelining
//! rule are resolved per variant; anything the wire model does not know by
//! name is carried as [`Command::Generic`].

mod argument;
mod serialize;

use std::fmt;

use bytes::Bytes;

use crate::error::Result;

pub use serialize::build_from_commands;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Placeholder for the server greeting. Contributes no bytes on the wire.
    Banner,
    /// EHLO - Extended greeting
    Ehlo {
        /// Client identifier
        identifier: String,
    },
    /// HELO - Simple greeting
    Helo {
        /// Client identifier
        identifier: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// MAIL FROM - Start mail transaction
    Mail {
        /// Sender address, without angle brackets
        address: String,
        /// SIZE parameter
        size: Option<u64>,
    },
    /// RCPT TO - Add recipient
    Rcpt {
        /// Recipient address, without angle brackets
        address: String,
    },
    /// DATA - Begin message data
    Data,
    /// Message body followed by the terminating `.` line.
    SendData {
        /// Body text, already dot-stuffed.
        data: Bytes,
    },
    /// RSET - Reset transaction
    Rset,
    /// QUIT - Close connection
    Quit,
    /// Line that is not a command.
    InvalidSyntax {
        /// The raw line, without its line terminator.
        line: String,
    },
    /// Any other verb.
    Generic {
        /// Verb, in its original case.
        name: String,
        /// Raw argument text.
        arg: Option<String>,
    },
}

impl Command {
    /// Creates an EHLO command.
    #[must_use]
    pub fn ehlo(identifier: impl Into<String>) -> Self {
        Self::Ehlo {
            identifier: identifier.into(),
        }
    }

    /// Creates a HELO command.
    #[must_use]
    pub fn helo(identifier: impl Into<String>) -> Self {
        Self::Helo {
            identifier: identifier.into(),
        }
    }

    /// Creates a MAIL command without parameters.
    #[must_use]
    pub fn mail(address: impl Into<String>) -> Self {
        Self::Mail {
            address: address.into(),
            size: None,
        }
    }

    /// Creates a MAIL command announcing the message size.
    #[must_use]
    pub fn mail_with_size(address: impl Into<String>, size: u64) -> Self {
        Self::Mail {
            address: address.into(),
            size: Some(size),
        }
    }

    /// Creates a RCPT command.
    #[must_use]
    pub fn rcpt(address: impl Into<String>) -> Self {
        Self::Rcpt {
            address: address.into(),
        }
    }

    /// Creates a message data block.
    #[must_use]
    pub fn send_data(data: impl Into<Bytes>) -> Self {
        Self::SendData { data: data.into() }
    }

    /// Creates a command with an arbitrary verb.
    #[must_use]
    pub fn generic(name: impl Into<String>, arg: Option<&str>) -> Self {
        Self::Generic {
            name: name.into(),
            arg: arg.map(str::to_string),
        }
    }

    /// Builds a command from a verb and its raw argument.
    ///
    /// Known verbs are matched case-insensitively; MAIL and RCPT arguments
    /// are parsed into addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandArg`](crate::Error::CommandArg) if a MAIL or
    /// RCPT argument is malformed.
    pub fn from_parts(name: &str, arg: Option<&str>) -> Result<Self> {
        let arg = arg.filter(|a| !a.is_empty());
        let cmd = match name.to_uppercase().as_str() {
            "EHLO" => Self::ehlo(arg.unwrap_or_default()),
            "HELO" => Self::helo(arg.unwrap_or_default()),
            "STARTTLS" => Self::StartTls,
            "MAIL" => Self::parse_mail(arg.unwrap_or_default())?,
            "RCPT" => Self::parse_rcpt(arg.unwrap_or_default())?,
            "DATA" => Self::Data,
            "RSET" => Self::Rset,
            "QUIT" => Self::Quit,
            _ => Self::generic(name, arg),
        };
        Ok(cmd)
    }

    /// Returns the protocol verb.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Banner => "[BANNER]",
            Self::Ehlo { .. } => "EHLO",
            Self::Helo { .. } => "HELO",
            Self::StartTls => "STARTTLS",
            Self::Mail { .. } => "MAIL",
            Self::Rcpt { .. } => "RCPT",
            Self::Data => "DATA",
            Self::SendData { .. } => "[SENDDATA]",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
            Self::InvalidSyntax { line } => line,
            Self::Generic { name, .. } => name,
        }
    }

    /// Returns the raw argument text, if any.
    #[must_use]
    pub fn arg(&self) -> Option<String> {
        match self {
            Self::Ehlo { identifier } | Self::Helo { identifier } => {
                Some(identifier.clone()).filter(|id| !id.is_empty())
            }
            Self::Mail { address, size } => Some(match size {
                Some(size) => format!("FROM:<{address}> SIZE={size}"),
                None => format!("FROM:<{address}>"),
            }),
            Self::Rcpt { address } => Some(format!("TO:<{address}>")),
            Self::Generic { arg, .. } => arg.clone(),
            _ => None,
        }
    }

    /// Returns true if the verb matches, ignoring case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// Returns true if the command may be sent without waiting for the
    /// previous command's reply.
    #[must_use]
    pub const fn is_pipelined(&self) -> bool {
        matches!(
            self,
            Self::Mail { .. } | Self::Rcpt { .. } | Self::SendData { .. }
        )
    }
}

impl fmt::Display for Command {
    /// Renders the command line as it appears on the wire.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banner => f.write_str("[[Banner]]"),
            Self::SendData { .. } => f.write_str("[[Message Data]]"),
            Self::InvalidSyntax { line } => f.write_str(line),
            _ => match self.arg() {
                Some(arg) if !arg.is_empty() => write!(f, "{} {arg}", self.name()),
                _ => f.write_str(self.name()),
            },
        }
    }
}
