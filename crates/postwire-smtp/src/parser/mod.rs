//! Incremental SMTP wire parser.
//!
//! Both directions of the dialog are parsed from arbitrary byte chunks. The
//! parsers keep whatever they could not yet decide on and pick up where they
//! left off when more bytes arrive, so the result never depends on how the
//! stream was split.
//!
//! # Example
//!
//! ```
//! use postwire_smtp::parser::ReplyParser;
//!
//! let mut parser = ReplyParser::new();
//! assert!(parser.feed(b"250-mail.example.com\r\n250 PIPEL").is_empty());
//! let replies = parser.feed(b"INING\r\n");
//! assert_eq!(replies.len(), 1);
//! assert_eq!(replies[0].message(), "mail.example.com\r\nPIPELINING");
//! ```

mod command;
mod line;
mod reply;

pub use command::{CommandParser, parse_commands};
pub use reply::{ReplyParser, parse_replies};
