//! IMAP response parsing.
//!
//! The parser operates on the raw response blob a [`crate::connection::Transport`]
//! read for one tagged command, dispatching on the [`CommandKind`] that was
//! sent. It never talks to a socket itself (sans-I/O): give it bytes and a
//! tag, get back a [`Response`] or a [`crate::error::ParseError`] describing
//! the offending line.
//!
//! Per-command grammars live in [`routines`] (the common ones: `SELECT`,
//! `SEARCH`, `LIST`/`LSUB`, `STATUS`, `EXPUNGE`, `STORE`, `CAPABILITY`,
//! `NOOP`/`IDLE`, `LOGOUT`) and [`fetch`] (`FETCH`, which is the one
//! grammar complex enough to need its own item-by-item sub-lexer).

mod fetch;
mod routines;
mod response;

pub use response::{
    AccessMode, FetchEntry, FetchValue, MailboxListEntry, Payload, Response, ResponseStatus,
    StoreResult,
};

use crate::command::CommandKind;
use crate::error::{ParseError, Result};
use crate::wire::{split_logical_lines, strip_eol};

/// The common envelope every response shares, plus the untagged lines left
/// for the per-command routine to interpret.
pub(crate) struct Envelope<'a> {
    pub command: CommandKind,
    pub status: ResponseStatus,
    pub message: Option<String>,
    pub bye_seen: bool,
    /// Untagged lines (each still `CRLF`-terminated, literal bytes inline),
    /// in the order they were received, excluding the final tagged line.
    pub untagged: Vec<&'a [u8]>,
}

impl Envelope<'_> {
    pub fn fail(&self, message: impl Into<String>, line: impl Into<String>) -> crate::error::Error {
        ParseError::new(self.command, message, line).into()
    }
}

/// Parses the response to one tagged command.
///
/// `command_line` is the request line that was sent (e.g. `"A0001 SELECT
/// INBOX"`); only `SELECT`/`EXAMINE` need it, to recover the mailbox name
/// the response itself doesn't always echo back.
///
/// # Errors
///
/// Returns [`crate::error::Error::Parse`] if `blob` doesn't match the
/// grammar recognized for `command`: a missing or malformed tagged status
/// line, an unrecognized `FETCH` item name, or a structurally invalid
/// parenthesized list where one was required.
pub fn parse(blob: &[u8], tag: &str, command: CommandKind, command_line: &str) -> Result<Response> {
    let lines = split_logical_lines(blob);
    let envelope = build_envelope(&lines, tag, command)?;

    let payload = match command {
        CommandKind::Select | CommandKind::Examine => {
            routines::parse_select(&envelope, command_line)?
        }
        CommandKind::Search => routines::parse_search(&envelope)?,
        CommandKind::List | CommandKind::Lsub => routines::parse_mailbox_list(&envelope)?,
        CommandKind::Status => routines::parse_status(&envelope)?,
        CommandKind::Expunge => routines::parse_expunge(&envelope),
        CommandKind::Store => routines::parse_store(&envelope)?,
        CommandKind::Capability => routines::parse_capability(&envelope),
        CommandKind::Noop | CommandKind::Idle => routines::parse_lines(&envelope),
        CommandKind::Logout => routines::parse_logout(&envelope),
        CommandKind::Fetch => fetch::parse_fetch(&envelope)?,
        _ => Payload::None,
    };

    Ok(Response {
        status: envelope.status,
        message: envelope.message,
        bye_seen: envelope.bye_seen,
        payload,
    })
}

/// Extracts the tagged status line and classifies every untagged line,
/// watching for `* BYE` (sets `bye_seen`) and `* NO`/`* BAD` (logged, then
/// skipped over -- the response as a whole is not a failure just because
/// one informational line reported a problem).
fn build_envelope<'a>(
    lines: &'a [Vec<u8>],
    tag: &str,
    command: CommandKind,
) -> Result<Envelope<'a>> {
    let (tagged, untagged_raw) = lines
        .split_last()
        .ok_or_else(|| ParseError::new(command, "empty response", String::new()))?;

    if !(tagged.len() > tag.len()
        && tagged[..tag.len()] == *tag.as_bytes()
        && tagged[tag.len()] == b' ')
    {
        return Err(ParseError::new(
            command,
            format!("expected tagged response for {tag:?}"),
            String::from_utf8_lossy(tagged).into_owned(),
        )
        .into());
    }

    let tail = strip_eol(&tagged[tag.len() + 1..]);
    let tail_str = String::from_utf8_lossy(tail);
    let mut parts = tail_str.splitn(2, ' ');
    let status_word = parts.next().unwrap_or_default();
    let message = parts.next().map(str::to_string).filter(|s| !s.is_empty());

    let status = ResponseStatus::parse(status_word).ok_or_else(|| {
        ParseError::new(
            command,
            "tagged response missing OK/NO/BAD status",
            tail_str.clone().into_owned(),
        )
    })?;

    let mut bye_seen = false;
    let mut untagged = Vec::with_capacity(untagged_raw.len());
    for line in untagged_raw {
        let body = strip_eol(line);
        if body.starts_with(b"* ") {
            let rest = &body[2..];
            if crate::wire::starts_with_ignore_case(rest, "BYE") {
                bye_seen = true;
            } else if crate::wire::starts_with_ignore_case(rest, "NO")
                || crate::wire::starts_with_ignore_case(rest, "BAD")
            {
                tracing::warn!(
                    target: "antik_imap::parser",
                    line = %String::from_utf8_lossy(body),
                    "server reported an untagged NO/BAD; continuing"
                );
            }
        }
        untagged.push(line.as_slice());
    }

    Ok(Envelope {
        command,
        status,
        message,
        bye_seen,
        untagged,
    })
}
