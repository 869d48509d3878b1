//! Sans-I/O SMTP connection engine.
//!
//! The engine owns the command queue of one connection. Commands are queued
//! with [`Engine::send_command`]; the engine decides when they may go out and
//! correlates each incoming reply with the command it answers. Replies always
//! arrive in send order, so correlation is positional.
//!
//! ```text
//!  send_command ──► to_send ──flush──► waiting ──reply──► Event::Reply
//!                                 │
//!                                 └──► Transmit (one per batch)
//! ```
//!
//! A batch runs up to and including the first command that cannot be
//! pipelined. When every queued command could be pipelined the engine holds
//! them back until something non-pipelinable is queued or a flush is forced.

use std::collections::VecDeque;

use super::{Handle, Protocol, Transmit};
use crate::command::{Command, build_from_commands};
use crate::error::Result;
use crate::event::Event;
use crate::parser::ReplyParser;

/// Caller request to a spawned [`Engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRequest {
    /// Queue a command.
    Send(Command),
    /// Send queued commands even if they could all be pipelined.
    Flush,
    /// Enable or disable pipelining.
    AllowPipelining(bool),
}

/// Connection-level state machine.
#[derive(Debug)]
pub struct Engine {
    /// Queued, not yet sent.
    to_send: VecDeque<Command>,
    /// Sent, awaiting a reply. Starts with the banner placeholder.
    waiting: VecDeque<Command>,
    pipelining: bool,
    replies: ReplyParser,
    outbound: VecDeque<Transmit>,
    /// No more commands or replies are processed.
    closed: bool,
    /// `Event::End` has been emitted or suppressed.
    ended: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine for a freshly opened connection.
    ///
    /// The first reply is expected to be the server greeting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            to_send: VecDeque::new(),
            waiting: VecDeque::from([Command::Banner]),
            pipelining: false,
            replies: ReplyParser::new(),
            outbound: VecDeque::new(),
            closed: false,
            ended: false,
        }
    }

    /// Queues a command and sends whatever may be sent now.
    pub fn send_command(&mut self, cmd: Command) {
        if self.closed {
            tracing::warn!(command = %cmd, "command queued on closed connection");
            return;
        }
        self.to_send.push_back(cmd);
        self.flush(false);
    }

    /// Sends queued commands even if they could all be pipelined.
    pub fn flush_commands(&mut self) {
        self.flush(true);
    }

    /// Enables or disables pipelining for subsequent flushes.
    pub fn allow_pipelining(&mut self, allow: bool) {
        if self.pipelining != allow {
            tracing::debug!(pipelining = allow, "pipelining changed");
        }
        self.pipelining = allow;
    }

    /// Returns true if batches may hold more than one command.
    #[must_use]
    pub const fn pipelining(&self) -> bool {
        self.pipelining
    }

    /// Drops every queued command that has not been sent yet.
    pub fn discard_unsent(&mut self) -> Vec<Command> {
        let dropped: Vec<Command> = self.to_send.drain(..).collect();
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "discarded unsent commands");
        }
        dropped
    }

    /// Returns the commands still awaiting a reply.
    pub fn awaiting(&self) -> impl Iterator<Item = &Command> {
        self.waiting.iter()
    }

    /// Returns the number of queued commands not yet sent.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.to_send.len()
    }

    /// Returns true once QUIT was answered, the stream ended, or the engine
    /// was destroyed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds bytes received from the server.
    pub fn handle_input(&mut self, data: &[u8]) -> Vec<Event> {
        if self.closed {
            tracing::trace!(len = data.len(), "input after close dropped");
            return Vec::new();
        }
        tracing::trace!(data = %String::from_utf8_lossy(data), "S:");

        let mut events = Vec::new();
        for reply in self.replies.feed(data) {
            let Some(command) = self.waiting.pop_front() else {
                tracing::warn!(%reply, "reply with no command awaiting it");
                continue;
            };
            let quit = command == Command::Quit;
            events.push(Event::Reply { reply, command });
            if quit {
                self.close();
                self.ended = true;
                events.push(Event::End);
                break;
            }
            if self.waiting.is_empty() {
                events.push(Event::Drain);
            }
        }
        events
    }

    /// Handles the end of the byte stream.
    pub fn handle_eof(&mut self) -> Vec<Event> {
        self.close();
        if self.ended {
            return Vec::new();
        }
        self.ended = true;
        if !self.waiting.is_empty() {
            tracing::debug!(unanswered = self.waiting.len(), "stream ended with commands in flight");
        }
        vec![Event::End]
    }

    /// Returns the next write, if any.
    ///
    /// Queued commands held back while replies were outstanding are flushed
    /// here, after the owner has seen the replies.
    pub fn poll_transmit(&mut self) -> Option<Transmit> {
        self.flush(false);
        self.outbound.pop_front()
    }

    /// Tears the connection down. No further events are produced.
    pub fn destroy(&mut self) {
        if self.closed && self.ended {
            return;
        }
        tracing::debug!("engine destroyed");
        self.close();
        self.ended = true;
        self.outbound.clear();
    }

    fn close(&mut self) {
        self.closed = true;
        self.to_send.clear();
        self.replies.reset();
    }

    fn flush(&mut self, force: bool) {
        if self.closed || !self.waiting.is_empty() || self.to_send.is_empty() {
            return;
        }
        let pipelining = self.pipelining;
        let len = match self
            .to_send
            .iter()
            .position(|cmd| !pipelining || !cmd.is_pipelined())
        {
            Some(index) => index + 1,
            None if force => self.to_send.len(),
            None => return,
        };

        let batch: Vec<Command> = self.to_send.drain(..len).collect();
        let data = build_from_commands(&batch);
        tracing::trace!(commands = batch.len(), data = %String::from_utf8_lossy(&data), "C:");
        self.waiting.extend(batch);
        if !data.is_empty() {
            self.outbound.push_back(Transmit::new(data));
        }
    }
}

impl Protocol for Engine {
    type Request = EngineRequest;

    fn handle_request(&mut self, request: EngineRequest) -> Vec<Event> {
        match request {
            EngineRequest::Send(cmd) => self.send_command(cmd),
            EngineRequest::Flush => self.flush_commands(),
            EngineRequest::AllowPipelining(allow) => self.allow_pipelining(allow),
        }
        Vec::new()
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

impl Handle<Engine> {
    /// Queues a command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if
    /// the connection has finished.
    pub fn send_command(&self, cmd: Command) -> Result<()> {
        self.request(EngineRequest::Send(cmd))
    }

    /// Forces queued commands out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if
    /// the connection has finished.
    pub fn flush_commands(&self) -> Result<()> {
        self.request(EngineRequest::Flush)
    }

    /// Enables or disables pipelining.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if
    /// the connection has finished.
    pub fn allow_pipelining(&self, allow: bool) -> Result<()> {
        self.request(EngineRequest::AllowPipelining(allow))
    }
}
