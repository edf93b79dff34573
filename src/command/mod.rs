//! IMAP command classification and tagging.
//!
//! The core does not build a typed command AST: callers hand
//! [`crate::session::Session::send_command`] a raw command line (everything
//! after the tag), and this module's job is twofold:
//!
//! - assign each outgoing command a fresh, unique tag ([`TagGenerator`])
//! - classify a command line into the [`CommandKind`] the parser should
//!   dispatch its response to
//!
//! Classification is a plain match over a fixed table rather than runtime
//! global state. A command kind with no dedicated parse routine in
//! [`crate::parser`] still gets its tagged status line parsed; it just
//! carries no payload.

mod tag_generator;

pub use tag_generator::TagGenerator;

/// The closed set of IMAP verbs the core recognises.
///
/// Response parsing is dispatched on this enum; a command kind with no
/// dedicated parse routine falls back to [`crate::parser::parse_default`],
/// which extracts only the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `STARTTLS`
    StartTls,
    /// `AUTHENTICATE`
    Authenticate,
    /// `LOGIN`
    Login,
    /// `CAPABILITY`
    Capability,
    /// `SELECT`
    Select,
    /// `EXAMINE`
    Examine,
    /// `CREATE`
    Create,
    /// `DELETE`
    Delete,
    /// `RENAME`
    Rename,
    /// `SUBSCRIBE`
    Subscribe,
    /// `UNSUBSCRIBE`
    Unsubscribe,
    /// `LIST`
    List,
    /// `LSUB`
    Lsub,
    /// `STATUS`
    Status,
    /// `APPEND`
    Append,
    /// `CHECK`
    Check,
    /// `CLOSE`
    Close,
    /// `EXPUNGE`
    Expunge,
    /// `SEARCH`
    Search,
    /// `FETCH`
    Fetch,
    /// `STORE`
    Store,
    /// `COPY`
    Copy,
    /// `UID` with no recognised verb following it.
    Uid,
    /// `NOOP`
    Noop,
    /// `LOGOUT`
    Logout,
    /// `IDLE`
    Idle,
}

impl CommandKind {
    /// Classifies the command verb in `line` (the text that follows the
    /// tag, e.g. `"SELECT INBOX"` or `"UID FETCH 1:5 (FLAGS)"`).
    ///
    /// Per the `UID` dispatch rule: when the line starts with `UID `, the
    /// effective kind for parser dispatch is the verb that follows, e.g.
    /// `UID FETCH` dispatches as [`Self::Fetch`].
    #[must_use]
    pub fn classify(line: &str) -> Self {
        let trimmed = line.trim_start();
        let (first, rest) = split_word(trimmed);

        if first.eq_ignore_ascii_case("UID") {
            let (second, _) = split_word(rest);
            if second.is_empty() {
                return Self::Uid;
            }
            return Self::from_verb(second).unwrap_or(Self::Uid);
        }

        // An unrecognized verb isn't a NOOP and must not get the Noop routine's
        // accumulate-every-line payload; fall back to a kind whose parser
        // routine is the default `Payload::None` arm.
        Self::from_verb(first).unwrap_or(Self::Check)
    }

    fn from_verb(verb: &str) -> Option<Self> {
        match_ignore_case(
            verb,
            &[
                ("STARTTLS", Self::StartTls),
                ("AUTHENTICATE", Self::Authenticate),
                ("LOGIN", Self::Login),
                ("CAPABILITY", Self::Capability),
                ("SELECT", Self::Select),
                ("EXAMINE", Self::Examine),
                ("CREATE", Self::Create),
                ("DELETE", Self::Delete),
                ("RENAME", Self::Rename),
                ("SUBSCRIBE", Self::Subscribe),
                ("UNSUBSCRIBE", Self::Unsubscribe),
                ("LIST", Self::List),
                ("LSUB", Self::Lsub),
                ("STATUS", Self::Status),
                ("APPEND", Self::Append),
                ("CHECK", Self::Check),
                ("CLOSE", Self::Close),
                ("EXPUNGE", Self::Expunge),
                ("SEARCH", Self::Search),
                ("FETCH", Self::Fetch),
                ("STORE", Self::Store),
                ("COPY", Self::Copy),
                ("UID", Self::Uid),
                ("NOOP", Self::Noop),
                ("LOGOUT", Self::Logout),
                ("IDLE", Self::Idle),
            ],
        )
    }

    /// Returns the canonical uppercase verb for this command kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartTls => "STARTTLS",
            Self::Authenticate => "AUTHENTICATE",
            Self::Login => "LOGIN",
            Self::Capability => "CAPABILITY",
            Self::Select => "SELECT",
            Self::Examine => "EXAMINE",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Rename => "RENAME",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::List => "LIST",
            Self::Lsub => "LSUB",
            Self::Status => "STATUS",
            Self::Append => "APPEND",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Search => "SEARCH",
            Self::Fetch => "FETCH",
            Self::Store => "STORE",
            Self::Copy => "COPY",
            Self::Uid => "UID",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Idle => "IDLE",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(' ') {
        Some(idx) => (&s[..idx], s[idx + 1..].trim_start()),
        None => (s, ""),
    }
}

fn match_ignore_case<T: Copy>(needle: &str, table: &[(&str, T)]) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(needle))
        .map(|(_, kind)| *kind)
}

/// Writes an IMAP astring (atom or quoted string), escaping `"` and `\`.
///
/// Mirrors the wire-format quoting a real server expects for `LOGIN`
/// credentials and bare mailbox names.
#[must_use]
pub fn quote_astring(s: &str) -> String {
    let needs_quoting = s.is_empty() || s.bytes().any(needs_quoting_byte);
    if !needs_quoting {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            out.push('\\');
        }
        out.push(b as char);
    }
    out.push('"');
    out
}

const fn needs_quoting_byte(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

/// Builds the line for a `LOGIN` command (without tag or CRLF).
#[must_use]
pub fn login_line(user: &str, password: &str) -> String {
    format!("LOGIN {} {}", quote_astring(user), quote_astring(password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plain_verbs() {
        assert_eq!(CommandKind::classify("SELECT INBOX"), CommandKind::Select);
        assert_eq!(CommandKind::classify("search 1 2 3"), CommandKind::Search);
        assert_eq!(CommandKind::classify("LOGOUT"), CommandKind::Logout);
    }

    #[test]
    fn classifies_uid_prefixed_verbs_by_the_following_verb() {
        assert_eq!(
            CommandKind::classify("UID FETCH 1:5 (FLAGS)"),
            CommandKind::Fetch
        );
        assert_eq!(
            CommandKind::classify("uid store 1 +FLAGS (\\Seen)"),
            CommandKind::Store
        );
    }

    #[test]
    fn bare_uid_falls_back_to_uid_kind() {
        assert_eq!(CommandKind::classify("UID"), CommandKind::Uid);
    }

    #[test]
    fn unrecognised_uid_followup_falls_back_to_uid_kind() {
        assert_eq!(CommandKind::classify("UID BOGUS 1"), CommandKind::Uid);
    }

    #[test]
    fn unrecognised_verb_does_not_fall_back_to_noop() {
        assert_eq!(CommandKind::classify("BOGUS 1"), CommandKind::Check);
    }

    #[test]
    fn quoting_escapes_special_characters() {
        assert_eq!(quote_astring("plain"), "plain");
        assert_eq!(quote_astring("has space"), "\"has space\"");
        assert_eq!(quote_astring("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_astring(""), "\"\"");
    }

    #[test]
    fn login_line_quotes_both_fields() {
        assert_eq!(
            login_line("user name", "p\"w"),
            "LOGIN \"user name\" \"p\\\"w\""
        );
    }
}
