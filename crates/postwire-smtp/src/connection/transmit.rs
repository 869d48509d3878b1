//! Outgoing bytes produced by the sans-I/O state machines.

use bytes::Bytes;

/// One write to the server.
///
/// A pipelined batch is always a single transmit, so the driver hands it to
/// the stream in one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    /// Raw bytes to send.
    pub data: Bytes,
}

impl Transmit {
    /// Creates a transmit from bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the data as a string slice, if valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Returns the length of the data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Transmit {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Transmit {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn text_batch() {
        let t: Transmit = b"MAIL FROM:<a@b>\r\nRCPT TO:<c@d>\r\n".to_vec().into();
        assert_eq!(t.as_str(), Some("MAIL FROM:<a@b>\r\nRCPT TO:<c@d>\r\n"));
        assert_eq!(t.len(), 32);
        assert!(!t.is_empty());
    }

    #[test]
    fn binary_body() {
        let t = Transmit::new(vec![0xff, b'\r', b'\n']);
        assert_eq!(t.as_str(), None);
        assert_eq!(t.as_ref(), &[0xff, b'\r', b'\n']);
    }
}
