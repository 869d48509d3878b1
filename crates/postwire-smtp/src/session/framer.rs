//! Message body framing for DATA.
//!
//! Fragments may split lines anywhere, including between CR and LF or right
//! before a leading dot; the framer carries that state from one fragment to
//! the next.

use bytes::{Bytes, BytesMut};

/// Turns body fragments into one dot-stuffed, CRLF-normalized block.
#[derive(Debug)]
pub struct MessageFramer {
    out: BytesMut,
    at_line_start: bool,
    pending_cr: bool,
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: BytesMut::new(),
            at_line_start: true,
            pending_cr: false,
        }
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: &[u8]) {
        self.out.reserve(fragment.len());
        for &b in fragment {
            if self.pending_cr {
                self.pending_cr = false;
                if b == b'\n' {
                    self.out.extend_from_slice(b"\r\n");
                    self.at_line_start = true;
                    continue;
                }
                self.out.extend_from_slice(b"\r");
                self.at_line_start = false;
            }
            match b {
                b'\r' => self.pending_cr = true,
                b'\n' => {
                    self.out.extend_from_slice(b"\r\n");
                    self.at_line_start = true;
                }
                _ => {
                    if self.at_line_start && b == b'.' {
                        self.out.extend_from_slice(b".");
                    }
                    self.out.extend_from_slice(&[b]);
                    self.at_line_start = false;
                }
            }
        }
    }

    /// Returns the number of framed bytes so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out.len() + usize::from(self.pending_cr)
    }

    /// Returns true if nothing has been framed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completes the body.
    ///
    /// One trailing line break is removed; the `.` line that follows the body
    /// on the wire supplies it again. The framer is reset for reuse.
    pub fn finish(&mut self) -> Bytes {
        if self.pending_cr {
            self.out.extend_from_slice(b"\r");
        }
        if self.out.ends_with(b"\r\n") {
            self.out.truncate(self.out.len() - 2);
        }
        self.at_line_start = true;
        self.pending_cr = false;
        self.out.split().freeze()
    }
}
