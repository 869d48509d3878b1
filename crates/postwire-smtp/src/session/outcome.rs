//! Per-message delivery results.

use crate::types::Reply;

/// Dialog step at which a message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Banner or greeting; the message was never started.
    Greeting,
    /// MAIL FROM
    Mail,
    /// DATA
    Data,
    /// The reply to the message body.
    Message,
}

/// Final state of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The server took responsibility for the message.
    Accepted(Reply),
    /// The server refused the message.
    Rejected {
        /// Where it was refused.
        stage: Stage,
        /// The refusing reply.
        reply: Reply,
    },
    /// No recipient was accepted, or the envelope had none.
    NoValidRecipients,
    /// The stream ended before the message completed.
    ConnectionLost,
}

/// Result of RCPT for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientStatus {
    /// Recipient address.
    pub address: String,
    /// The RCPT reply; `None` if the command never got an answer.
    pub reply: Option<Reply>,
}

impl RecipientStatus {
    /// Returns true if the server accepted this recipient.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.reply.as_ref().is_some_and(Reply::is_success)
    }
}

/// Outcome of one message in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    /// Envelope sender.
    pub sender: String,
    /// Per-recipient results, in envelope order.
    pub recipients: Vec<RecipientStatus>,
    /// Overall result.
    pub status: DeliveryStatus,
}

impl MessageOutcome {
    /// Returns true if the message was accepted for delivery.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self.status, DeliveryStatus::Accepted(_))
    }

    /// Returns the recipients the server accepted.
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.recipients
            .iter()
            .filter(|r| r.is_accepted())
            .map(|r| r.address.as_str())
    }

    /// Returns the recipients that were refused or never answered.
    pub fn rejected(&self) -> impl Iterator<Item = &RecipientStatus> {
        self.recipients.iter().filter(|r| !r.is_accepted())
    }
}
