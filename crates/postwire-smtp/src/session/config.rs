//! Session configuration.

/// Settings for the SMTP dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name sent with EHLO and HELO.
    pub identifier: String,
    /// Pipeline commands when the server advertises PIPELINING.
    pub allow_pipelining: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identifier: "localhost".to_string(),
            allow_pipelining: true,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with the given client identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// Sets whether pipelining may be used.
    #[must_use]
    pub const fn allow_pipelining(mut self, allow: bool) -> Self {
        self.allow_pipelining = allow;
        self
    }
}
