//! Sans-I/O SMTP session.
//!
//! A [`Session`] drives the client side of the dialog on top of an
//! [`Engine`]: it waits for the banner, greets with EHLO (falling back to
//! HELO once), then runs one envelope/DATA cycle per queued message and ends
//! with QUIT.
//!
//! ```text
//! AwaitBanner ──► Greeting(EHLO) ──► Greeting(HELO)
//!      │               │                  │
//!      │               └──────► Ready ◄───┘
//!      │                       │   ▲
//!      │                       ▼   │
//!      │                      Message
//!      │                       │
//!      └──────────► Quitting ◄─┘ ──► Closed
//! ```
//!
//! Callers feed requests ([`SessionRequest`]) and server bytes; the session
//! answers with [`Event`]s. Only one message is in flight at a time. Requests
//! for later messages wait in an inbox until the current one is settled.
//!
//! Every queued `WriteHead` ends in exactly one [`Event::Message`], including
//! messages that never started because the greeting failed or the stream
//! ended. Requests arriving after QUIT was sent are dropped.

mod config;
mod framer;
mod outcome;

use std::collections::VecDeque;

use bytes::Bytes;

pub use config::SessionConfig;
pub use framer::MessageFramer;
pub use outcome::{DeliveryStatus, MessageOutcome, RecipientStatus, Stage};

use crate::command::Command;
use crate::connection::{Engine, Handle, Protocol, Transmit};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::types::{Envelope, EsmtpExtensions, Reply, ReplyCode, parse_ehlo_string};

/// Caller request to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    /// Start a new message.
    WriteHead(Envelope),
    /// Add a body fragment to the current message.
    Write(Bytes),
    /// Add a last fragment and end the body.
    End(Bytes),
    /// No more messages; close the session.
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Greeting {
    Ehlo,
    Helo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitBanner,
    Greeting(Greeting),
    Ready,
    Message,
    Quitting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// MAIL, RCPT and DATA are in flight.
    Envelope,
    /// DATA was accepted; body fragments are being framed.
    Body,
    /// The body was sent; waiting for the final reply.
    Result,
}

/// The message currently in flight.
#[derive(Debug)]
struct Transaction {
    sender: String,
    recipients: Vec<RecipientStatus>,
    rcpt_replies: usize,
    phase: Phase,
    /// Set once the message is known to fail; the final reply is then moot.
    failure: Option<DeliveryStatus>,
    /// The caller's end marker has been consumed.
    body_ended: bool,
}

impl Transaction {
    fn new(envelope: &Envelope) -> Self {
        Self {
            sender: envelope.sender().to_string(),
            recipients: envelope
                .recipients()
                .iter()
                .map(|address| RecipientStatus {
                    address: address.clone(),
                    reply: None,
                })
                .collect(),
            rcpt_replies: 0,
            phase: Phase::Envelope,
            failure: None,
            body_ended: false,
        }
    }

    fn rcpt_accepted(&self) -> bool {
        self.recipients.iter().any(RecipientStatus::is_accepted)
    }

    fn into_outcome(self, status: DeliveryStatus) -> MessageOutcome {
        MessageOutcome {
            sender: self.sender,
            recipients: self.recipients,
            status,
        }
    }
}

/// SMTP session state machine.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    engine: Engine,
    state: State,
    extensions: EsmtpExtensions,
    inbox: VecDeque<SessionRequest>,
    current: Option<Transaction>,
    framer: MessageFramer,
    /// Drop body fragments up to the next end marker.
    skip_body: bool,
}

impl Session {
    /// Creates a session for a freshly opened connection.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            engine: Engine::new(),
            state: State::AwaitBanner,
            extensions: EsmtpExtensions::new(),
            inbox: VecDeque::new(),
            current: None,
            framer: MessageFramer::new(),
            skip_body: false,
        }
    }

    /// Returns the extensions advertised in the last EHLO reply.
    #[must_use]
    pub const fn extensions(&self) -> &EsmtpExtensions {
        &self.extensions
    }

    /// Returns true if commands are being pipelined.
    #[must_use]
    pub const fn pipelining(&self) -> bool {
        self.engine.pipelining()
    }

    /// Returns true once the session can do nothing more.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Queues the envelope of a new message.
    pub fn write_head(&mut self, envelope: Envelope) -> Vec<Event> {
        self.handle_request(SessionRequest::WriteHead(envelope))
    }

    /// Queues a body fragment.
    pub fn write(&mut self, fragment: impl Into<Bytes>) -> Vec<Event> {
        self.handle_request(SessionRequest::Write(fragment.into()))
    }

    /// Queues the last body fragment and ends the message.
    pub fn end(&mut self, fragment: impl Into<Bytes>) -> Vec<Event> {
        self.handle_request(SessionRequest::End(fragment.into()))
    }

    /// Queues the end of the session.
    pub fn finish(&mut self) -> Vec<Event> {
        self.handle_request(SessionRequest::Finish)
    }

    /// Processes one caller request.
    ///
    /// Returns the events it settles right away, such as the outcome of an
    /// envelope without recipients.
    pub fn handle_request(&mut self, request: SessionRequest) -> Vec<Event> {
        let mut events = Vec::new();
        if matches!(self.state, State::Quitting | State::Closed) {
            tracing::warn!(?request, "request after session end dropped");
            return events;
        }
        self.inbox.push_back(request);
        self.pump(&mut events);
        events
    }

    /// Feeds bytes received from the server.
    pub fn handle_input(&mut self, data: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        for event in self.engine.handle_input(data) {
            match event {
                Event::Reply { reply, command } => {
                    let reaction = self.on_reply(&reply, &command);
                    events.push(Event::Reply { reply, command });
                    events.extend(reaction);
                }
                Event::End => {
                    self.lose_current(&mut events);
                    self.abandon_queued(&DeliveryStatus::ConnectionLost, &mut events);
                    self.state = State::Closed;
                    events.push(Event::End);
                }
                other => events.push(other),
            }
        }
        self.pump(&mut events);
        events
    }

    /// Handles the end of the byte stream.
    pub fn handle_eof(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let end = self.engine.handle_eof();
        if !end.is_empty() {
            self.lose_current(&mut events);
            self.abandon_queued(&DeliveryStatus::ConnectionLost, &mut events);
            events.extend(end);
        }
        self.state = State::Closed;
        events
    }

    /// Returns the next write, if any.
    pub fn poll_transmit(&mut self) -> Option<Transmit> {
        self.engine.poll_transmit()
    }

    /// Tears the session down. No further events are produced.
    pub fn destroy(&mut self) {
        self.engine.destroy();
        self.state = State::Closed;
        self.inbox.clear();
        self.current = None;
    }

    fn on_reply(&mut self, reply: &Reply, command: &Command) -> Vec<Event> {
        let mut events = Vec::new();
        match command {
            Command::Banner => self.on_banner(reply, &mut events),
            Command::Ehlo { .. } => self.on_ehlo(reply),
            Command::Helo { .. } => self.on_helo(reply, &mut events),
            Command::Mail { .. } => self.on_mail(reply, &mut events),
            Command::Rcpt { .. } => self.on_rcpt(reply),
            Command::Data => self.on_data(reply, &mut events),
            Command::SendData { .. } => self.on_message(reply, &mut events),
            _ => {}
        }
        events
    }

    fn on_banner(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        if reply.code() == Some(ReplyCode::SERVICE_READY) {
            tracing::debug!("banner accepted, sending EHLO");
            self.state = State::Greeting(Greeting::Ehlo);
            self.engine.send_command(Command::ehlo(&self.config.identifier));
        } else {
            tracing::warn!(%reply, "server refused connection");
            events.push(Event::Error(Error::from_reply(reply)));
            self.refuse_queued(reply, events);
            self.quit();
        }
    }

    fn on_ehlo(&mut self, reply: &Reply) {
        if !reply.is_success() {
            tracing::debug!(%reply, "EHLO rejected, falling back to HELO");
            self.state = State::Greeting(Greeting::Helo);
            self.engine.send_command(Command::helo(&self.config.identifier));
            return;
        }
        self.extensions = parse_ehlo_string(reply.message()).extensions;
        let pipelining = self.config.allow_pipelining && self.extensions.supports_pipelining();
        self.engine.allow_pipelining(pipelining);
        tracing::debug!(extensions = self.extensions.len(), pipelining, "EHLO accepted");
        self.state = State::Ready;
    }

    fn on_helo(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        if reply.is_success() {
            tracing::debug!("HELO accepted");
            self.extensions.reset();
            self.engine.allow_pipelining(false);
            self.state = State::Ready;
        } else {
            tracing::warn!(%reply, "HELO rejected");
            events.push(Event::Error(Error::from_reply(reply)));
            self.refuse_queued(reply, events);
            self.quit();
        }
    }

    fn on_mail(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        if reply.is_success() {
            return;
        }
        let Some(txn) = self.current.as_mut() else {
            return;
        };
        tracing::debug!(%reply, sender = %txn.sender, "MAIL rejected");
        txn.failure = Some(DeliveryStatus::Rejected {
            stage: Stage::Mail,
            reply: reply.clone(),
        });
        let dropped = self.engine.discard_unsent();
        if dropped.contains(&Command::Data) {
            self.complete(events);
        }
    }

    fn on_rcpt(&mut self, reply: &Reply) {
        let Some(txn) = self.current.as_mut() else {
            return;
        };
        let index = txn.rcpt_replies;
        txn.rcpt_replies += 1;
        if let Some(rcpt) = txn.recipients.get_mut(index) {
            if !reply.is_success() {
                tracing::debug!(%reply, address = %rcpt.address, "recipient rejected");
            }
            rcpt.reply = Some(reply.clone());
        }
    }

    fn on_data(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        let Some(txn) = self.current.as_mut() else {
            return;
        };
        if reply.code_type() == Some('3') {
            if txn.failure.is_none() && txn.rcpt_accepted() {
                txn.phase = Phase::Body;
                return;
            }
            // DATA was accepted anyway; close it with an empty body.
            if txn.failure.is_none() {
                txn.failure = Some(DeliveryStatus::NoValidRecipients);
            }
            txn.phase = Phase::Result;
            self.engine.send_command(Command::send_data(Bytes::new()));
            self.engine.flush_commands();
            return;
        }
        if txn.failure.is_none() {
            txn.failure = Some(if txn.rcpt_accepted() {
                DeliveryStatus::Rejected {
                    stage: Stage::Data,
                    reply: reply.clone(),
                }
            } else {
                DeliveryStatus::NoValidRecipients
            });
        }
        self.complete(events);
    }

    fn on_message(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        let Some(txn) = self.current.as_mut() else {
            return;
        };
        if txn.failure.is_none() {
            txn.failure = Some(if reply.is_success() {
                DeliveryStatus::Accepted(reply.clone())
            } else {
                DeliveryStatus::Rejected {
                    stage: Stage::Message,
                    reply: reply.clone(),
                }
            });
        }
        self.complete(events);
    }

    /// Settles the current message and reports it.
    fn complete(&mut self, events: &mut Vec<Event>) {
        let Some(mut txn) = self.current.take() else {
            return;
        };
        let status = txn.failure.take().unwrap_or(DeliveryStatus::ConnectionLost);
        if !txn.body_ended {
            self.skip_body = true;
            self.framer.finish();
        }
        if self.state == State::Message {
            self.state = State::Ready;
        }
        tracing::debug!(?status, sender = %txn.sender, "message settled");
        events.push(Event::Message(txn.into_outcome(status)));
    }

    fn lose_current(&mut self, events: &mut Vec<Event>) {
        if let Some(txn) = self.current.as_mut() {
            tracing::debug!(sender = %txn.sender, "connection lost with message in flight");
            txn.failure.get_or_insert(DeliveryStatus::ConnectionLost);
            self.complete(events);
        }
    }

    /// Settles every queued message that never started.
    fn abandon_queued(&mut self, status: &DeliveryStatus, events: &mut Vec<Event>) {
        for request in self.inbox.drain(..) {
            if let SessionRequest::WriteHead(envelope) = request {
                tracing::debug!(sender = envelope.sender(), ?status, "queued message abandoned");
                let outcome = Transaction::new(&envelope).into_outcome(status.clone());
                events.push(Event::Message(outcome));
            }
        }
        self.skip_body = false;
    }

    fn refuse_queued(&mut self, reply: &Reply, events: &mut Vec<Event>) {
        let status = DeliveryStatus::Rejected {
            stage: Stage::Greeting,
            reply: reply.clone(),
        };
        self.abandon_queued(&status, events);
    }

    fn quit(&mut self) {
        self.state = State::Quitting;
        self.engine.send_command(Command::Quit);
    }

    fn start_message(&mut self, envelope: &Envelope) {
        tracing::debug!(
            sender = envelope.sender(),
            recipients = envelope.recipients().len(),
            "starting message"
        );
        self.current = Some(Transaction::new(envelope));
        self.state = State::Message;
        let mail = match envelope.size() {
            Some(size) => Command::mail_with_size(envelope.sender(), size),
            None => Command::mail(envelope.sender()),
        };
        self.engine.send_command(mail);
        for rcpt in envelope.recipients() {
            self.engine.send_command(Command::rcpt(rcpt.as_str()));
        }
        self.engine.send_command(Command::Data);
    }

    /// Consumes queued requests as far as the current state allows.
    fn pump(&mut self, events: &mut Vec<Event>) {
        loop {
            match self.state {
                State::Ready => {
                    let Some(request) = self.inbox.pop_front() else {
                        return;
                    };
                    match request {
                        SessionRequest::WriteHead(envelope) => {
                            if self.skip_body {
                                tracing::warn!("new message before end of previous body");
                                self.skip_body = false;
                            }
                            if envelope.recipients().is_empty() {
                                tracing::debug!(sender = envelope.sender(), "envelope without recipients");
                                let outcome = Transaction::new(&envelope)
                                    .into_outcome(DeliveryStatus::NoValidRecipients);
                                events.push(Event::Message(outcome));
                                self.skip_body = true;
                                continue;
                            }
                            self.start_message(&envelope);
                        }
                        SessionRequest::Write(_) if self.skip_body => {}
                        SessionRequest::End(_) if self.skip_body => self.skip_body = false,
                        SessionRequest::Write(_) | SessionRequest::End(_) => {
                            tracing::warn!("body fragment without a message");
                        }
                        SessionRequest::Finish => {
                            tracing::debug!("no more messages, sending QUIT");
                            self.quit();
                        }
                    }
                }
                State::Message => {
                    self.pump_body();
                    return;
                }
                _ => return,
            }
        }
    }

    /// Frames queued body fragments and sends the body once it is complete.
    fn pump_body(&mut self) {
        let Some(txn) = self.current.as_mut() else {
            return;
        };
        if txn.phase != Phase::Body {
            return;
        }
        let mut ended = false;
        while let Some(request) = self.inbox.pop_front() {
            match request {
                SessionRequest::Write(fragment) => self.framer.push(&fragment),
                SessionRequest::End(fragment) => {
                    self.framer.push(&fragment);
                    ended = true;
                    break;
                }
                other => {
                    tracing::warn!("message body ended implicitly");
                    self.inbox.push_front(other);
                    ended = true;
                    break;
                }
            }
        }
        if !ended {
            return;
        }

        txn.body_ended = true;
        txn.phase = Phase::Result;
        let body = self.framer.finish();
        tracing::debug!(len = body.len(), "sending message body");
        self.engine.send_command(Command::send_data(body));
        if matches!(self.inbox.front(), Some(SessionRequest::Finish)) {
            self.inbox.pop_front();
            tracing::debug!("no more messages, sending QUIT");
            self.quit();
        } else {
            self.engine.flush_commands();
        }
    }
}

impl Protocol for Session {
    type Request = SessionRequest;

    fn handle_request(&mut self, request: SessionRequest) -> Vec<Event> {
        Self::handle_request(self, request)
    }

    fn handle_input(&mut self, data: &[u8]) -> Vec<Event> {
        Self::handle_input(self, data)
    }

    fn handle_eof(&mut self) -> Vec<Event> {
        Self::handle_eof(self)
    }

    fn poll_transmit(&mut self) -> Option<Transmit> {
        Self::poll_transmit(self)
    }

    fn is_closed(&self) -> bool {
        Self::is_closed(self)
    }

    fn destroy(&mut self) {
        Self::destroy(self);
    }
}

impl Handle<Session> {
    /// Starts a new message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection has finished.
    pub fn write_head(&self, envelope: Envelope) -> Result<()> {
        self.request(SessionRequest::WriteHead(envelope))
    }

    /// Adds a body fragment to the current message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection has finished.
    pub fn write(&self, fragment: impl Into<Bytes>) -> Result<()> {
        self.request(SessionRequest::Write(fragment.into()))
    }

    /// Adds the last body fragment and ends the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection has finished.
    pub fn end(&self, fragment: impl Into<Bytes>) -> Result<()> {
        self.request(SessionRequest::End(fragment.into()))
    }

    /// Ends the session once queued messages are done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection has finished.
    pub fn finish(&self) -> Result<()> {
        self.request(SessionRequest::Finish)
    }
}
