//! The typed response model.
//!
//! Every parsed response carries the same envelope (status, message,
//! `bye_seen`) plus a [`Payload`] whose shape depends on the command kind
//! that was dispatched. Unlike the richer AST a full protocol
//! implementation would build, these payloads stay close to the wire: maps
//! of item name to raw string value rather than typed fields, because the
//! grammar this core recognizes is deliberately the permissive subset
//! described for each command below.

use std::collections::HashMap;

/// The three possible statuses of a tagged IMAP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Command succeeded.
    Ok,
    /// Command failed, but the connection remains usable.
    No,
    /// The command itself was malformed or unsupported by the server.
    Bad,
}

impl ResponseStatus {
    /// Returns true for [`Self::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Parses the three-letter status word, case-insensitively.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("OK") {
            Some(Self::Ok)
        } else if word.eq_ignore_ascii_case("NO") {
            Some(Self::No)
        } else if word.eq_ignore_ascii_case("BAD") {
            Some(Self::Bad)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        })
    }
}

/// Whether a mailbox was opened for reading and writing ([`SELECT`]) or
/// read-only ([`EXAMINE`]).
///
/// [`SELECT`]: crate::command::CommandKind::Select
/// [`EXAMINE`]: crate::command::CommandKind::Examine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Opened via `SELECT`.
    ReadWrite,
    /// Opened via `EXAMINE`.
    ReadOnly,
}

/// A single entry of a `LIST`/`LSUB` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxListEntry {
    /// Mailbox attributes (e.g. `\HasNoChildren`, `\Noselect`), as given.
    pub attributes: Vec<String>,
    /// The hierarchy delimiter, if the server reported one (not `NIL`).
    pub delimiter: Option<char>,
    /// The mailbox name.
    pub mailbox: String,
}

/// One `STORE` result line: the message index and its resulting flag list
/// verbatim (e.g. `"(\\Seen \\Answered)"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResult {
    /// Sequence number or UID, depending on whether `UID STORE` was used.
    pub index: u64,
    /// The raw parenthesized flag list as returned by the server.
    pub flags: String,
}

/// The value of a single `FETCH` data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchValue {
    /// A plain textual value (atom, quoted string, or parenthesized list
    /// rendered back to its wire form).
    Text(String),
    /// A numeric value (e.g. `UID`, `RFC822.SIZE`).
    Number(u64),
    /// A literal's raw octets (e.g. `BODY[TEXT]`, `RFC822`).
    Literal(Vec<u8>),
}

/// One `FETCH` response line: the message index and its requested items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEntry {
    /// Sequence number (or UID, for `UID FETCH`).
    pub index: u64,
    /// Item name (e.g. `"FLAGS"`, `"BODY[TEXT]"`) to parsed value.
    pub items: HashMap<String, FetchValue>,
}

/// The command-shaped payload of a parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `SELECT`/`EXAMINE`: the mailbox name, its access mode, and the
    /// untagged data items the server reported (`EXISTS`, `RECENT`,
    /// `UIDVALIDITY`, `FLAGS`, response-code items, etc.) as raw strings.
    SelectedMailbox {
        /// The mailbox name from the command line (the server doesn't
        /// normally echo it back).
        mailbox: String,
        /// Read-write or read-only, from the tagged `OK` response code.
        access_mode: AccessMode,
        /// Item name (uppercased) to its raw value.
        items: HashMap<String, String>,
    },
    /// `SEARCH`: the matched sequence numbers or UIDs, in server order.
    Search(Vec<u64>),
    /// `LIST`/`LSUB`: one entry per untagged response line.
    MailboxList(Vec<MailboxListEntry>),
    /// `STATUS`: the mailbox name and its requested status items.
    Status {
        /// The mailbox name as reported by the server.
        mailbox: String,
        /// Item name (uppercased) to its raw value.
        items: HashMap<String, String>,
    },
    /// `EXPUNGE` (and `CLOSE`/`SELECT` side effects the session doesn't
    /// otherwise surface): counts of `EXISTS` seen and sequence numbers
    /// reported via `EXPUNGE`.
    Expunge {
        /// Every `* n EXISTS` value seen, in order.
        exists: Vec<u64>,
        /// Every `* n EXPUNGE` value seen, in order.
        expunged: Vec<u64>,
    },
    /// `STORE`: the resulting flag set for each affected message.
    Store(Vec<StoreResult>),
    /// `CAPABILITY`: the raw, space-separated capability list.
    Capability(String),
    /// `NOOP`/`IDLE`: every untagged line seen while waiting, verbatim
    /// (e.g. `"* 3 EXISTS"`, `"* 1 EXPUNGE"`), without further parsing.
    Lines(Vec<String>),
    /// `FETCH`: one entry per message in the response.
    Fetch(Vec<FetchEntry>),
    /// `LOGOUT`: every untagged line preceding the tagged response
    /// (normally just `* BYE ...`), verbatim.
    Logout(Vec<String>),
    /// Any command kind with no dedicated payload shape: only the common
    /// envelope fields are populated.
    None,
}

/// A fully parsed response to one tagged command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// `OK`, `NO`, or `BAD` from the tagged status line.
    pub status: ResponseStatus,
    /// The free-text portion of the tagged status line, if any.
    pub message: Option<String>,
    /// Set once a `* BYE` untagged response has been observed on this
    /// response (or any earlier one on the same connection: callers are
    /// expected to latch this monotonically across calls).
    pub bye_seen: bool,
    /// The command-shaped data.
    pub payload: Payload,
}
