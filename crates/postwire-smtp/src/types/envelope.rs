//! Message envelope.

/// Sender and recipients of a single message.
///
/// Recipients form an ordered set: duplicates are dropped, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    sender: String,
    recipients: Vec<String>,
    size: Option<u64>,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new<I, S>(sender: impl Into<String>, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut envelope = Self {
            sender: sender.into(),
            recipients: Vec::new(),
            size: None,
        };
        for rcpt in recipients {
            envelope.add_recipient(rcpt);
        }
        envelope
    }

    /// Announces the message size with the MAIL command.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Adds a recipient unless it is already present.
    pub fn add_recipient(&mut self, rcpt: impl Into<String>) {
        let rcpt = rcpt.into();
        if !self.recipients.contains(&rcpt) {
            self.recipients.push(rcpt);
        }
    }

    /// Returns the sender address. Empty means the null reverse-path.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the recipients in insertion order.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Returns the announced size.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_deduplicated_in_order() {
        let env = Envelope::new("a@x", ["b@x", "c@x", "b@x"]);
        assert_eq!(env.recipients(), ["b@x", "c@x"]);
        assert_eq!(env.sender(), "a@x");
        assert_eq!(env.size(), None);
    }

    #[test]
    fn size_option() {
        let env = Envelope::new("", Vec::<String>::new()).with_size(42);
        assert_eq!(env.size(), Some(42));
        assert!(env.recipients().is_empty());
    }
}
