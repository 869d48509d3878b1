//! Reply stream parser.

use std::sync::LazyLock;

use regex::Regex;

use super::line::LineBuffer;
use crate::types::{Reply, ReplyCode};

static PARTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{3})-(.*)$").unwrap_or_else(|e| unreachable!("partial reply pattern is valid: {e}"))
});

static FINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{3})(?: (.*))?$").unwrap_or_else(|e| unreachable!("final reply pattern is valid: {e}"))
});

/// Incremental parser for server replies.
///
/// Continuation lines (`DDD-text`) are held until the final line (`DDD text`)
/// arrives; the reply then carries every line's text joined with CRLF. A line
/// that is neither becomes [`Reply::InvalidSyntax`] without disturbing a reply
/// in progress.
#[derive(Debug, Default)]
pub struct ReplyParser {
    lines: LineBuffer,
    pending: Vec<(ReplyCode, String)>,
}

impl ReplyParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds received bytes and returns every reply they complete.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Reply> {
        self.lines.extend(data);
        let mut replies = Vec::new();
        while let Some(line) = self.lines.next_line() {
            if let Some(reply) = self.parse_line(line) {
                replies.push(reply);
            }
        }
        replies
    }

    /// Returns the bytes of the trailing incomplete line.
    #[must_use]
    pub fn remainder(&self) -> &[u8] {
        self.lines.as_bytes()
    }

    /// Returns true if a multi-line reply has started but not finished.
    #[must_use]
    pub fn in_reply(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops all buffered state.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.pending.clear();
    }

    fn parse_line(&mut self, line: String) -> Option<Reply> {
        if let Some(caps) = PARTIAL_RE.captures(&line) {
            let code = caps.get(1).and_then(|m| ReplyCode::from_digits(m.as_str()))?;
            let text = caps.get(2).map_or("", |m| m.as_str());
            self.pending.push((code, text.to_string()));
            return None;
        }

        let finished = FINAL_RE.captures(&line).and_then(|caps| {
            let code = caps.get(1).and_then(|m| ReplyCode::from_digits(m.as_str()))?;
            Some((code, caps.get(2).map_or("", |m| m.as_str()).to_string()))
        });
        let Some((code, text)) = finished else {
            tracing::debug!(line = %line, "unparseable reply line");
            return Some(Reply::invalid(line));
        };

        if let Some((first, _)) = self.pending.first()
            && *first != code
        {
            tracing::warn!(%first, %code, "reply code changed within multi-line reply");
        }
        let mut message: Vec<String> = self.pending.drain(..).map(|(_, text)| text).collect();
        message.push(text);
        Some(Reply::parsed(code, message.join("\r\n")))
    }
}

/// Parses a complete buffer of replies.
///
/// Returns the replies and the bytes of the trailing incomplete line.
#[must_use]
pub fn parse_replies(data: &[u8]) -> (Vec<Reply>, Vec<u8>) {
    let mut parser = ReplyParser::new();
    let replies = parser.feed(data);
    (replies, parser.remainder().to_vec())
}
