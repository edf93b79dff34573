//! # antik-imap
//!
//! A blocking IMAP4rev1 client core: a literal-aware transport, a command
//! issuer, a response parser that dispatches on command kind, a
//! second-stage parser for `BODYSTRUCTURE` trees, and a thin session facade
//! tying the four together.
//!
//! The design deliberately does not chase every optional RFC 3501
//! extension: the parser is permissive (it assumes a syntactically correct
//! server and reports a single opaque [`Error::Parse`] rather than
//! attempting recovery), and only the item names and response codes listed
//! in the module docs below are recognized.
//!
//! ## Error model
//!
//! Three kinds, matching [`Error`]'s variants:
//!
//! - [`Error::Transport`]: the socket is unreadable, unwritable, TLS
//!   negotiation failed, or the peer closed mid-response. Fatal to the
//!   session -- subsequent calls on the same [`Session`] will keep failing.
//! - [`Error::Parse`]: the raw response blob didn't match the grammar
//!   expected for the dispatched command. Non-fatal: the caller may issue
//!   further commands, but the specific response is discarded. Carries the
//!   offending line verbatim.
//! - [`Error::Protocol`]: the server answered `NO` or `BAD`. Only raised by
//!   [`Session::execute`]; [`parser::parse`] itself never raises it, since a
//!   non-OK status is still a well-formed response.
//!
//! ## Quick start
//!
//! ```no_run
//! use antik_imap::connection::Config;
//! use antik_imap::Session;
//!
//! # fn run() -> antik_imap::Result<()> {
//! let config = Config::new("imap.example.com");
//! let mut session = Session::connect(&config, "user@example.com", "hunter2")?;
//!
//! let response = session.execute("SELECT INBOX")?;
//! println!("{:?}", response.payload);
//!
//! session.disconnect()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`connection`]: [`connection::Transport`] -- the blocking,
//!   literal-aware byte channel, plus TLS/STARTTLS stream setup and
//!   [`connection::Config`].
//! - [`issuer`]: [`issuer::Issuer`] -- tags and sends one command at
//!   a time, returning the raw response blob for its tag.
//! - [`parser`]: [`parser::parse`] -- the typed [`parser::Response`]
//!   dispatcher, one routine per recognized command kind.
//! - [`body_structure`]: [`body_structure::parse`] and [`body_structure::walk`]
//!   -- the second-stage `BODYSTRUCTURE` tree parser and its visitor
//!   contract, including the built-in [`body_structure::AttachmentVisitor`].
//! - [`session`]: [`Session`] -- `connect`/`execute`/`disconnect`.
//! - [`command`]: [`command::CommandKind`] classification and tag
//!   generation shared by the issuer and the parser dispatch table.

pub mod body_structure;
pub mod command;
pub mod connection;
mod error;
pub mod issuer;
pub mod parser;
pub mod session;
pub mod wire;

pub use command::CommandKind;
pub use error::{Error, ParseError, Result, TransportError};
pub use issuer::{IssuedCommand, Issuer};
pub use parser::{Payload, Response, ResponseStatus};
pub use session::Session;
