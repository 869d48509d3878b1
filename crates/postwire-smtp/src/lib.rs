//! # postwire-smtp
//!
//! An outbound SMTP/ESMTP protocol engine (RFC 5321, RFC 2920 pipelining).
//!
//! ## Features
//!
//! - **Incremental wire parser**: replies and commands are parsed from
//!   arbitrary byte chunks, including the DATA body and its `.` terminator
//! - **Pipelining**: MAIL, RCPT and DATA go out in one write when the server
//!   advertises PIPELINING
//! - **Sans-I/O core**: [`Engine`] and [`Session`] are plain state machines;
//!   [`spawn`] drives either over any tokio byte stream
//! - **Partial delivery**: one rejected recipient does not fail the message
//!
//! ## Quick Start
//!
//! ```no_run
//! use postwire_smtp::{ClientConfig, Envelope, Event, open};
//!
//! #[tokio::main]
//! async fn main() -> postwire_smtp::Result<()> {
//!     let config = ClientConfig::builder("smtp.example.com")
//!         .identifier("client.example.com")
//!         .build();
//!     let (session, mut events) = open(&config).await?;
//!
//!     session.write_head(Envelope::new("sender@example.com", ["rcpt@example.com"]))?;
//!     session.end("Subject: Test\r\n\r\nHello, World!\r\n")?;
//!     session.finish()?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::Message(outcome) => println!("{:?}", outcome.status),
//!             Event::Error(e) => eprintln!("{e}"),
//!             Event::End => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Dialog
//!
//! ```text
//! S: 220 banner
//! C: EHLO id            (HELO id if EHLO is refused)
//! C: MAIL FROM:<a>      ┐
//! C: RCPT TO:<b>        │ one write when pipelining
//! C: DATA               ┘
//! C: body / .
//! C: QUIT
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP commands and their wire form
//! - [`parser`]: Incremental reply and command parsers
//! - [`types`]: Replies, extensions, envelopes
//! - [`connection`]: Engine, async driver, transports and configuration
//! - [`session`]: Dialog orchestration and message framing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
mod event;
pub mod parser;
pub mod session;
pub mod types;

pub use command::{Command, build_from_commands};
pub use connection::{
    ClientConfig, ClientConfigBuilder, Engine, EngineRequest, Handle, Protocol, Security,
    SmtpStream, Transmit, open, spawn,
};
pub use error::{Error, Result};
pub use event::Event;
pub use session::{
    DeliveryStatus, MessageOutcome, RecipientStatus, Session, SessionConfig, SessionRequest,
    Stage,
};
pub use types::{EsmtpExtensions, Envelope, Extension, Reply, ReplyCode};
