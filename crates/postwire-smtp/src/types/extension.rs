//! ESMTP extension registry.
//!
//! The registry is rebuilt from every successful EHLO reply. The first line of
//! the reply is free text (usually the server's greeting); every following
//! line advertises one extension, optionally followed by a parameter:
//!
//! ```text
//! 250-mail.example.com greets you
//! 250-PIPELINING
//! 250-SIZE 52428800
//! 250 8BITMIME
//! ```

use std::sync::LazyLock;

use regex::Regex;

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-zA-Z0-9][a-zA-Z0-9\-]*)([ \t]+(.*?))?\s*$").unwrap_or_else(|e| {
        unreachable!("extension pattern is valid: {e}")
    })
});

/// Well-known SMTP extension keywords.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// SIZE - Maximum message size
    Size,
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// CHUNKING - Chunked message transfer
    Chunking,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// DSN - Delivery status notifications
    Dsn,
    /// BINARYMIME - Binary MIME
    BinaryMime,
    /// Any other keyword, upper-cased.
    Other(String),
}

impl Extension {
    /// Classifies an extension keyword (case-insensitive).
    #[must_use]
    pub fn parse(keyword: &str) -> Self {
        let keyword = keyword.to_uppercase();
        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "SIZE" => Self::Size,
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "CHUNKING" => Self::Chunking,
            "SMTPUTF8" => Self::SmtpUtf8,
            "DSN" => Self::Dsn,
            "BINARYMIME" => Self::BinaryMime,
            _ => Self::Other(keyword),
        }
    }

    /// Returns the keyword as advertised on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::StartTls => "STARTTLS",
            Self::Size => "SIZE",
            Self::EightBitMime => "8BITMIME",
            Self::Pipelining => "PIPELINING",
            Self::Chunking => "CHUNKING",
            Self::SmtpUtf8 => "SMTPUTF8",
            Self::Dsn => "DSN",
            Self::BinaryMime => "BINARYMIME",
            Self::Other(keyword) => keyword,
        }
    }
}

/// Set of extensions advertised by a server.
///
/// Names are stored upper-cased and looked up case-insensitively. Insertion
/// order is kept so that [`build_ehlo_string`] reproduces the advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsmtpExtensions {
    entries: Vec<(String, Option<String>)>,
}

impl EsmtpExtensions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every extension.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Adds an extension, replacing the parameter if it is already present.
    ///
    /// An empty parameter is stored as no parameter.
    pub fn add(&mut self, name: &str, param: Option<&str>) {
        let name = name.to_uppercase();
        let param = param.filter(|p| !p.is_empty()).map(str::to_string);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = param,
            None => self.entries.push((name, param)),
        }
    }

    /// Removes an extension.
    pub fn drop(&mut self, name: &str) {
        let name = name.to_uppercase();
        self.entries.retain(|(n, _)| *n != name);
    }

    /// Returns true if the extension is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Returns the extension's parameter, if it has one.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(|(_, p)| p.as_deref())
    }

    /// Returns true if the well-known extension is present.
    #[must_use]
    pub fn supports(&self, extension: &Extension) -> bool {
        self.has(extension.as_str())
    }

    /// Returns true if the server advertised PIPELINING.
    #[must_use]
    pub fn supports_pipelining(&self) -> bool {
        self.supports(&Extension::Pipelining)
    }

    /// Returns true if the server advertised STARTTLS.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised with a value.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.param(Extension::Size.as_str())
            .and_then(|size| size.trim().parse().ok())
    }

    /// Iterates over `(name, parameter)` pairs in advertisement order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_deref()))
    }

    /// Returns the number of extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no extension is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&(String, Option<String>)> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Parsed EHLO reply text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EhloResponse {
    /// First line of the reply.
    pub header: String,
    /// Extensions advertised on the remaining lines.
    pub extensions: EsmtpExtensions,
}

/// Parses the message of an EHLO reply.
///
/// Lines that do not look like an extension keyword are ignored.
#[must_use]
pub fn parse_ehlo_string(data: &str) -> EhloResponse {
    let mut lines = data
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));
    let header = lines.next().unwrap_or_default().to_string();

    let mut extensions = EsmtpExtensions::new();
    for line in lines {
        if let Some(caps) = EXTENSION_RE.captures(line) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            extensions.add(name, caps.get(3).map(|m| m.as_str()));
        }
    }

    EhloResponse { header, extensions }
}

/// Builds EHLO reply text from a header and a registry.
#[must_use]
pub fn build_ehlo_string(extensions: &EsmtpExtensions, header: &str) -> String {
    let mut lines = vec![header.to_string()];
    for (name, param) in extensions.iter() {
        match param {
            Some(param) => lines.push(format!("{name} {param}")),
            None => lines.push(name.to_string()),
        }
    }
    lines.join("\r\n")
}
