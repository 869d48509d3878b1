//! Wire serialization.

use super::Command;

const CRLF: &[u8] = b"\r\n";

impl Command {
    /// Appends the wire form of the command to `buf`.
    ///
    /// Message data is written as-is, followed by the terminating `.` line.
    /// The banner contributes nothing.
    pub fn push_onto(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Banner => {}
            Self::SendData { data } => {
                if !data.is_empty() {
                    buf.extend_from_slice(data);
                    buf.extend_from_slice(CRLF);
                }
                buf.extend_from_slice(b".\r\n");
            }
            other => {
                buf.extend_from_slice(other.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.push_onto(&mut buf);
        buf
    }
}

/// Serializes a sequence of commands into a single write.
#[must_use]
pub fn build_from_commands<'a>(commands: impl IntoIterator<Item = &'a Command>) -> Vec<u8> {
    let mut buf = Vec::new();
    for cmd in commands {
        cmd.push_onto(&mut buf);
    }
    buf
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn serialize_ehlo() {
        assert_eq!(Command::ehlo("client.example.com").serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn serialize_mail() {
        assert_eq!(Command::mail("sender@example.com").serialize(), b"MAIL FROM:<sender@example.com>\r\n");
        assert_eq!(Command::mail("").serialize(), b"MAIL FROM:<>\r\n");
    }

    #[test]
    fn serialize_banner_is_empty() {
        assert!(Command::Banner.serialize().is_empty());
    }

    #[test]
    fn serialize_empty_data() {
        assert_eq!(Command::send_data("").serialize(), b".\r\n");
    }

    #[test]
    fn serialize_body_keeps_trailing_newline() {
        assert_eq!(
            Command::send_data("hello\r\nstuff\r\n").serialize(),
            b"hello\r\nstuff\r\n\r\n.\r\n"
        );
    }

    #[test]
    fn build_session() {
        let commands = [
            Command::Banner,
            Command::ehlo("there"),
            Command::mail("test1@address"),
            Command::rcpt("test2@address"),
            Command::Data,
            Command::send_data("test\none\r\ntwo"),
            Command::Quit,
        ];
        assert_eq!(
            build_from_commands(&commands),
            b"EHLO there\r\nMAIL FROM:<test1@address>\r\nRCPT TO:<test2@address>\r\nDATA\r\ntest\none\r\ntwo\r\n.\r\nQUIT\r\n"
        );
    }

    #[test]
    fn build_data_without_body() {
        assert_eq!(build_from_commands(&[Command::Data, Command::send_data("")]), b"DATA\r\n.\r\n");
    }

    #[test]
    fn every_variant_parses_back() {
        let commands = [
            Command::Banner,
            Command::ehlo("client.example.com"),
            Command::helo("client"),
            Command::StartTls,
            Command::mail_with_size("a@x", 12),
            Command::rcpt("b@x"),
            Command::Data,
            Command::send_data("hello\r\n..dot\r\nend\r\n"),
            Command::Data,
            Command::send_data(""),
            Command::Rset,
            Command::generic("NOOP", Some("x y")),
            Command::Quit,
        ];
        let (parsed, rest) = crate::parser::parse_commands(&build_from_commands(&commands));
        assert_eq!(parsed, commands[1..].to_vec());
        assert!(rest.is_empty());
    }
}
