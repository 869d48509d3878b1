//! Async driver for the sans-I/O state machines.
//!
//! [`spawn`] moves a [`Protocol`] and its byte stream into a tokio task. The
//! task serializes the two things that can happen to a connection: a caller
//! request arriving on the handle's channel, and bytes arriving on the
//! stream. Every write produced in response goes out before the next stimulus
//! is taken.

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::Transmit;
use crate::error::{Error, Result};
use crate::event::Event;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// A connection state machine that can be driven by [`spawn`].
pub trait Protocol: Send + 'static {
    /// Caller request type.
    type Request: fmt::Debug + Send + 'static;

    /// Applies a caller request and returns the events it settles at once.
    fn handle_request(&mut self, request: Self::Request) -> Vec<Event>;

    /// Feeds bytes received from the server.
    fn handle_input(&mut self, data: &[u8]) -> Vec<Event>;

    /// Handles the end of the byte stream.
    fn handle_eof(&mut self) -> Vec<Event>;

    /// Returns the next write, if any.
    fn poll_transmit(&mut self) -> Option<Transmit>;

    /// Returns true once nothing more will be read or written.
    fn is_closed(&self) -> bool;

    /// Tears the state machine down without further events.
    fn destroy(&mut self);
}

enum Control<R> {
    Request(R),
    Destroy,
}

/// Caller side of a spawned connection.
///
/// Calls never block; they are queued for the connection task. Dropping every
/// handle does not close the connection, the task keeps reading until the
/// dialog ends.
pub struct Handle<P: Protocol> {
    tx: mpsc::UnboundedSender<Control<P::Request>>,
}

impl<P: Protocol> Clone for Handle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P: Protocol> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<P: Protocol> Handle<P> {
    /// Queues a request for the connection task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the task has finished.
    pub fn request(&self, request: P::Request) -> Result<()> {
        self.tx
            .send(Control::Request(request))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Tears the connection down and drops the stream.
    ///
    /// No events are delivered afterwards. Calling it again has no effect.
    pub fn destroy(&self) {
        if self.tx.send(Control::Destroy).is_err() {
            tracing::trace!("destroy on finished connection");
        }
    }

    /// Returns true once the connection task has finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Runs `protocol` over `stream` in a new tokio task.
///
/// Returns the caller handle and the event receiver. [`Event::Connect`] is
/// always the first event; [`Event::End`] is the last unless the connection
/// was destroyed.
pub fn spawn<P, S>(protocol: P, stream: S) -> (Handle<P>, mpsc::UnboundedReceiver<Event>)
where
    P: Protocol,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, requests) = mpsc::unbounded_channel();
    let (events, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(protocol, stream, requests, events));
    (Handle { tx }, rx)
}

fn forward(sink: &mpsc::UnboundedSender<Event>, events: Vec<Event>) {
    for event in events {
        if sink.send(event).is_err() {
            tracing::trace!("event receiver dropped");
            return;
        }
    }
}

async fn write_pending<P, S>(protocol: &mut P, stream: &mut S) -> std::io::Result<()>
where
    P: Protocol,
    S: AsyncWrite + Unpin,
{
    let mut wrote = false;
    while let Some(transmit) = protocol.poll_transmit() {
        stream.write_all(&transmit.data).await?;
        wrote = true;
    }
    if wrote {
        stream.flush().await?;
    }
    Ok(())
}

async fn run<P, S>(
    mut protocol: P,
    mut stream: S,
    mut requests: mpsc::UnboundedReceiver<Control<P::Request>>,
    events: mpsc::UnboundedSender<Event>,
) where
    P: Protocol,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    forward(&events, vec![Event::Connect]);
    let mut buf = Vec::with_capacity(READ_BUFFER_SIZE);
    let mut requests_open = true;

    loop {
        if let Err(e) = write_pending(&mut protocol, &mut stream).await {
            tracing::warn!(?e, "write failed");
            forward(&events, vec![Event::Error(e.into())]);
            forward(&events, protocol.handle_eof());
            break;
        }
        if protocol.is_closed() {
            break;
        }

        tokio::select! {
            // Queued requests are applied before any reply that follows them.
            biased;
            control = requests.recv(), if requests_open => match control {
                Some(Control::Request(request)) => {
                    let produced = protocol.handle_request(request);
                    forward(&events, produced);
                }
                Some(Control::Destroy) => {
                    tracing::debug!("connection destroyed");
                    protocol.destroy();
                    return;
                }
                None => requests_open = false,
            },
            read = stream.read_buf(&mut buf) => match read {
                Ok(0) => {
                    tracing::debug!("server closed the stream");
                    forward(&events, protocol.handle_eof());
                    break;
                }
                Ok(_) => {
                    let produced = protocol.handle_input(&buf);
                    buf.clear();
                    forward(&events, produced);
                }
                Err(e) => {
                    tracing::warn!(?e, "read failed");
                    forward(&events, vec![Event::Error(e.into())]);
                    forward(&events, protocol.handle_eof());
                    break;
                }
            },
        }
    }

    if let Err(e) = stream.shutdown().await {
        tracing::trace!(?e, "shutdown failed");
    }
}
