//! Connection-level plumbing: configuration, the plaintext/TLS stream
//! abstraction, and the literal-aware blocking transport built on top of it.
//!
//! [`crate::session::Session`] is the caller-facing facade; this module is
//! its foundation and is not usually used directly.

mod config;
mod stream;
mod transport;

pub use config::{Config, ConfigBuilder, Security, DEFAULT_MAX_LITERAL_BYTES};
pub use stream::{ImapStream, connect_plain, connect_tls};
pub use transport::Transport;
