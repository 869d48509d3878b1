//! SMTP connection management.
//!
//! - [`Engine`]: sans-I/O command queue with pipelining and reply correlation
//! - [`spawn`] / [`Handle`]: runs an engine or a session in a tokio task
//! - [`SmtpStream`], [`connect`], [`connect_tls`]: TCP and implicit TLS
//!   transports
//! - [`ClientConfig`]: what to connect to and how to greet

mod config;
mod driver;
mod engine;
mod stream;
mod transmit;

pub use config::{ClientConfig, ClientConfigBuilder, Security};
pub use driver::{Handle, Protocol, spawn};
pub use engine::{Engine, EngineRequest};
pub use stream::{SmtpStream, connect, connect_tls};
pub use transmit::Transmit;

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::session::Session;

/// Opens a stream as configured and starts a session on it.
///
/// # Errors
///
/// Returns an error if the stream cannot be opened within the configured
/// connect timeout.
pub async fn open(config: &ClientConfig) -> Result<(Handle<Session>, mpsc::UnboundedReceiver<Event>)> {
    let connecting = async {
        match config.security {
            Security::None => connect(&config.host, config.port).await,
            Security::Implicit => connect_tls(&config.host, config.port).await,
        }
    };
    let stream = tokio::time::timeout(config.connect_timeout, connecting)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))??;
    tracing::debug!(host = %config.host, port = config.port, "session starting");
    Ok(spawn(Session::new(config.session.clone()), stream))
}
