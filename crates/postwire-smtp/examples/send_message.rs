#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: deliver one message to a local SMTP server
//!
//! ## Running
//!
//! Start any SMTP sink on port 2525 (for example `python -m aiosmtpd -n -l :2525`), then:
//!
//! ```bash
//! RUST_LOG=postwire_smtp=debug cargo run --package postwire-smtp --example send_message -- localhost 2525
//! ```

use postwire_smtp::{ClientConfig, DeliveryStatus, Envelope, Event, open};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port: u16 = args.next().map_or(Ok(2525), |p| p.parse())?;

    println!("Connecting to {}:{}...", host, port);
    let config = ClientConfig::builder(host).port(port).build();
    let (session, mut events) = open(&config).await?;

    session.write_head(Envelope::new(
        "sender@example.com",
        ["first@example.com", "second@example.com"],
    ))?;
    session.write("Subject: postwire test\r\n")?;
    session.write("\r\n")?;
    session.end(".leading dot survives\r\nbye\r\n")?;
    session.finish()?;

    while let Some(event) = events.recv().await {
        match event {
            Event::Reply { reply, command } => println!("{:<12} {}", command.name(), reply),
            Event::Message(outcome) => {
                match &outcome.status {
                    DeliveryStatus::Accepted(reply) => println!("✓ Accepted: {}", reply.message()),
                    other => println!("✗ Not delivered: {:?}", other),
                }
                for rcpt in outcome.rejected() {
                    println!("  rejected {}", rcpt.address);
                }
            }
            Event::Error(e) => eprintln!("error: {}", e),
            Event::End => break,
            Event::Connect | Event::Drain => {}
        }
    }
    Ok(())
}
