//! Error types for the IMAP core.
//!
//! The core distinguishes three error kinds (see the module-level docs in
//! [`crate`] for the full contract):
//!
//! - [`Error::Transport`]: the socket is unreadable, unwritable, TLS
//!   negotiation failed, or the peer closed mid-response. Fatal to the
//!   session.
//! - [`Error::Parse`]: the raw response blob violated the grammar expected
//!   for the dispatched command. Non-fatal: the caller may issue further
//!   commands, but the specific response is discarded.
//! - [`Error::Protocol`]: the server answered `NO` or `BAD`. The typed
//!   response is still produced with a non-OK status; this variant is only
//!   raised by [`crate::session::Session`] methods that opt into
//!   "raise on non-OK" semantics.

use thiserror::Error;

/// Errors produced by the IMAP core.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport is broken: DNS/TCP/TLS failure, a write that could not
    /// complete, or a read that hit EOF before the tagged terminator.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The raw response blob did not match the grammar expected for the
    /// command kind that was dispatched.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The server answered the command with `NO` or `BAD`.
    #[error("server returned {status:?}: {message}")]
    Protocol {
        /// The non-OK status the server returned.
        status: crate::parser::ResponseStatus,
        /// The full tagged status line.
        message: String,
    },
}

/// Transport-layer failure. Fatal to the owning session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying I/O failure (DNS, connect, read, or write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption failure.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The hostname could not be encoded as a TLS server name.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The peer closed the connection before the tagged terminator arrived.
    #[error("connection closed before tag {tag:?} was seen")]
    UnexpectedEof {
        /// The tag the caller was waiting on.
        tag: String,
    },

    /// A declared literal octet count (`{N}`) was rejected by the
    /// transport's resource policy (see [`crate::connection::Config::max_literal_bytes`]).
    #[error("literal of {declared} bytes exceeds the configured limit of {limit} bytes")]
    LiteralTooLarge {
        /// The `{N}` the server declared.
        declared: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// An operation was attempted in a state the transport does not support
    /// (e.g. STARTTLS on an already-upgraded stream).
    #[error("invalid transport state: {0}")]
    InvalidState(String),
}

/// The raw response blob violated the grammar for the dispatched command.
///
/// The offending line is preserved verbatim so callers can log or display
/// it; parsing of later commands on the same session is unaffected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to parse {command} response: {message} (at: {line:?})")]
pub struct ParseError {
    /// The command kind being parsed when the failure occurred.
    pub command: crate::command::CommandKind,
    /// Description of what went wrong.
    pub message: String,
    /// The offending line (or line fragment) verbatim.
    pub line: String,
}

impl ParseError {
    /// Builds a new parse error anchored to `command`.
    pub fn new(
        command: crate::command::CommandKind,
        message: impl Into<String>,
        line: impl Into<String>,
    ) -> Self {
        Self {
            command,
            message: message.into(),
            line: line.into(),
        }
    }
}

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
