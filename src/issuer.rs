//! The command issuer: tags a command line, writes it via the
//! transport, and collects the raw response blob for that tag.
//!
//! This sits between [`crate::connection::Transport`] (bytes in, bytes out)
//! and [`crate::session::Session`] (typed, command-aware facade). It knows
//! about tags and the `UID` dispatch rule, but nothing about response
//! grammar -- that's [`crate::parser`]'s job.

use crate::command::{CommandKind, TagGenerator};
use crate::connection::Transport;
use crate::error::Result;

/// One issued command: the tag it was sent under, the kind the parser
/// should dispatch its response to, the full command line (tag included,
/// for `SELECT`/`EXAMINE` mailbox-name recovery), and the raw response blob.
#[derive(Debug, Clone)]
pub struct IssuedCommand {
    /// The tag this command was sent under.
    pub tag: String,
    /// The command kind the parser should dispatch to (after the `UID`
    /// dispatch rule has been applied).
    pub kind: CommandKind,
    /// The full line that was sent on the wire, tag included (e.g.
    /// `"A0001 SELECT INBOX"`).
    pub line: String,
    /// The raw response blob `Transport::read_response` returned.
    pub response: Vec<u8>,
}

/// Tags and issues commands over a [`Transport`], one at a time.
pub struct Issuer {
    tags: TagGenerator,
}

impl Issuer {
    /// Creates an issuer using the default tag prefix (`A`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: TagGenerator::default(),
        }
    }

    /// Creates an issuer with a custom tag prefix, e.g. to keep tags
    /// distinguishable across multiple sessions sharing a log stream.
    #[must_use]
    pub fn with_tag_prefix(prefix: char) -> Self {
        Self {
            tags: TagGenerator::new(prefix),
        }
    }

    /// Tags `command_text` (the verb and arguments, without a tag or CRLF),
    /// writes it via `transport`, and reads the response blob for the tag
    /// it was assigned.
    ///
    /// The `UID` dispatch rule is applied here: if `command_text`
    /// starts with `UID `, the returned [`IssuedCommand::kind`] is the verb
    /// that follows rather than [`CommandKind::Uid`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Transport`] if the write or the read
    /// fails.
    pub fn send(&mut self, transport: &mut Transport, command_text: &str) -> Result<IssuedCommand> {
        let tag = self.tags.next();
        let line = format!("{tag} {command_text}");
        let kind = CommandKind::classify(command_text);

        transport.send_line(&line)?;
        let response = transport.read_response(&tag)?;

        Ok(IssuedCommand {
            tag,
            kind,
            line,
            response,
        })
    }
}

impl Default for Issuer {
    fn default() -> Self {
        Self::new()
    }
}
