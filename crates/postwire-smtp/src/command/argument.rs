//! MAIL and RCPT argument parsing.
//!
//! Addresses are extracted leniently: a bracketed path is unwrapped, an
//! unbracketed one is taken up to the first whitespace. A lone `<` or `>`
//! stays part of the address.

use std::sync::LazyLock;

use regex::Regex;

use super::Command;
use crate::error::{Error, Result};

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new($re).unwrap_or_else(|e| unreachable!("{} is valid: {e}", stringify!($name)))
        });
    };
}

pattern!(MAIL_RE, r"(?i)^from\s*:\s*(.*)");
pattern!(RCPT_RE, r"(?i)^to\s*:\s*(.*)");
pattern!(BRACKETED_RE, r"^<(.*)>([^\n>]*)$");
pattern!(BARE_RE, r"^(\S*)");
pattern!(SIZE_RE, r"(?i)\bsize=(\d+)\b");

/// Splits a path into the address and whatever parameters follow it.
fn split_path(path: &str) -> (&str, &str) {
    if let Some(caps) = BRACKETED_RE.captures(path) {
        let address = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        return (address, rest);
    }
    let address = BARE_RE.captures(path).and_then(|c| c.get(1)).map_or("", |m| m.as_str());
    (address, &path[address.len()..])
}

fn bad_argument(name: &str, arg: &str) -> Error {
    Error::command_arg("Bad argument", Command::generic(name, Some(arg)))
}

impl Command {
    /// Parses a MAIL argument such as `FROM:<a@b> SIZE=123`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandArg`] if the argument does not start with `FROM:`.
    pub fn parse_mail(arg: &str) -> Result<Self> {
        let path = MAIL_RE
            .captures(arg)
            .and_then(|c| c.get(1))
            .ok_or_else(|| bad_argument("MAIL", arg))?
            .as_str();
        let (address, params) = split_path(path);
        let size = SIZE_RE
            .captures(params)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());
        Ok(Self::Mail {
            address: address.to_string(),
            size,
        })
    }

    /// Parses a RCPT argument such as `TO:<a@b>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandArg`] if the argument does not start with `TO:`.
    pub fn parse_rcpt(arg: &str) -> Result<Self> {
        let path = RCPT_RE
            .captures(arg)
            .and_then(|c| c.get(1))
            .ok_or_else(|| bad_argument("RCPT", arg))?
            .as_str();
        let (address, _) = split_path(path);
        Ok(Self::rcpt(address))
    }
}
