//! Core SMTP types.

mod envelope;
mod extension;
mod reply;

pub use envelope::Envelope;
pub use extension::{EhloResponse, EsmtpExtensions, Extension, build_ehlo_string, parse_ehlo_string};
pub use reply::{Reply, ReplyCode};
