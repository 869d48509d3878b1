//! SMTP reply types.

use std::fmt;

/// SMTP reply from server.
///
/// A reply is always the answer to exactly one command, in send order. Lines
/// that could not be parsed still occupy a slot as [`Reply::InvalidSyntax`],
/// so positional correlation with the command stream is never broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Well-formed reply.
    Status {
        /// Reply code (e.g., 250).
        code: ReplyCode,
        /// Reply text; continuation lines are joined with CRLF.
        message: String,
    },
    /// Line that is not a reply at all.
    InvalidSyntax {
        /// The raw line, without its line terminator.
        line: String,
    },
}

impl Reply {
    /// Creates a reply, prefixing an enhanced status code (`2.0.0`, `4.0.0`
    /// or `5.0.0`) for 2xx, 4xx and 5xx codes.
    #[must_use]
    pub fn new(code: ReplyCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code.default_enhanced_status() {
            Some(esc) => Self::Status {
                code,
                message: format!("{esc} {message}"),
            },
            None => Self::Status { code, message },
        }
    }

    /// Creates a reply with an explicit enhanced status code.
    ///
    /// An empty `esc` suppresses the prefix entirely.
    #[must_use]
    pub fn with_esc(code: ReplyCode, message: impl Into<String>, esc: &str) -> Self {
        let message = message.into();
        if esc.is_empty() {
            Self::Status { code, message }
        } else {
            Self::Status {
                code,
                message: format!("{esc} {message}"),
            }
        }
    }

    /// Creates a reply exactly as it was received.
    #[must_use]
    pub fn parsed(code: ReplyCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Wraps an unparseable line.
    #[must_use]
    pub fn invalid(line: impl Into<String>) -> Self {
        Self::InvalidSyntax { line: line.into() }
    }

    /// Returns the reply code, if the reply was well-formed.
    #[must_use]
    pub const fn code(&self) -> Option<ReplyCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::InvalidSyntax { .. } => None,
        }
    }

    /// Returns the first digit of the reply code.
    #[must_use]
    pub fn code_type(&self) -> Option<char> {
        self.code().map(ReplyCode::class)
    }

    /// Returns the reply text, or the raw line for invalid replies.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::InvalidSyntax { line } => line,
        }
    }

    /// Returns the message split into its lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.message()
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code().is_some_and(ReplyCode::is_success)
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub fn is_intermediate(&self) -> bool {
        self.code().is_some_and(ReplyCode::is_intermediate)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub fn is_transient_error(&self) -> bool {
        self.code().is_some_and(ReplyCode::is_transient)
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub fn is_permanent_error(&self) -> bool {
        self.code().is_some_and(ReplyCode::is_permanent)
    }

    /// Returns true if the line could not be parsed as a reply.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::InvalidSyntax { .. })
    }
}

impl fmt::Display for Reply {
    /// Renders the reply in wire form, without the final CRLF.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::InvalidSyntax { line } => return f.write_str(line),
            Self::Status { code, .. } => *code,
        };
        let mut lines = self.lines().peekable();
        while let Some(line) = lines.next() {
            if lines.peek().is_some() {
                write!(f, "{code}-{line}\r\n")?;
            } else {
                write!(f, "{code} {line}")?;
            }
        }
        Ok(())
    }
}

/// Three-digit SMTP reply code.
///
/// The first digit classifies the reply: 2 done, 3 go on, 4 try again later,
/// 5 give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220, greeting.
    pub const SERVICE_READY: Self = Self(220);
    /// 221, answer to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 250, command completed.
    pub const OK: Self = Self(250);
    /// 354, send the message body.
    pub const START_DATA: Self = Self(354);
    /// 421, server is shutting the channel.
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 451, local error on the server side.
    pub const LOCAL_ERROR: Self = Self(451);
    /// 500, command not recognized.
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 503, commands out of order.
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 550, mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 554, transaction failed.
    pub const TRANSACTION_FAILED: Self = Self(554);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Parses exactly three ASCII digits.
    #[must_use]
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the first digit, which classifies the reply.
    #[must_use]
    pub fn class(self) -> char {
        char::from_digit(u32::from(self.0 / 100 % 10), 10).unwrap_or('0')
    }

    /// 2xx
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 / 100 == 2
    }

    /// 3xx
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 / 100 == 3
    }

    /// 4xx
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 / 100 == 4
    }

    /// 5xx
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 / 100 == 5
    }

    const fn default_enhanced_status(self) -> Option<&'static str> {
        match self.0 / 100 {
            2 => Some("2.0.0"),
            4 => Some("4.0.0"),
            5 => Some("5.0.0"),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
