//! Line splitting over a growing buffer.

use bytes::{Buf, BytesMut};

/// Accumulates bytes and hands out complete lines.
///
/// Lines end at LF; a CR directly before it is dropped.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: BytesMut,
    /// Leading bytes already known not to contain LF.
    scanned: usize,
}

impl LineBuffer {
    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Removes and returns the next complete line, decoded lossily.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let lf = self.scanned + offset;
        let mut line = self.buf.split_to(lf + 1);
        line.truncate(lf);
        if line.last() == Some(&b'\r') {
            line.truncate(lf - 1);
        }
        self.scanned = 0;
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Removes the first `n` bytes.
    pub(crate) fn take(&mut self, n: usize) -> BytesMut {
        self.scanned = self.scanned.saturating_sub(n);
        self.buf.split_to(n)
    }

    pub(crate) fn clear(&mut self) {
        self.scanned = 0;
        self.buf.advance(self.buf.len());
    }
}
