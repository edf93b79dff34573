//! Per-command parse routines for everything except `FETCH` (see [`super::fetch`]).
//!
//! Each routine walks [`Envelope::untagged`] looking for the tokens the
//! command's grammar recognizes, building the
//! [`Payload`] variant that matches the command kind. None of these
//! routines touch the socket; they only see the lines [`super::build_envelope`]
//! already split out and classified for `BYE`/`NO`/`BAD`.

use std::collections::HashMap;

use super::response::{AccessMode, MailboxListEntry, Payload, StoreResult};
use super::Envelope;
use crate::error::Result;
use crate::wire::{find_matching_paren, starts_with_ignore_case, strip_eol};

/// `SELECT`/`EXAMINE`: mailbox name from the command line, access mode from
/// the tagged `OK` response code, and every recognized data item from the
/// untagged lines.
pub fn parse_select(envelope: &Envelope<'_>, command_line: &str) -> Result<Payload> {
    let mailbox = last_token_unquoted(command_line);
    let mut items = HashMap::new();

    for line in &envelope.untagged {
        let body = strip_eol(line);
        let Some(rest) = body.strip_prefix(b"* ") else {
            continue;
        };
        let text = String::from_utf8_lossy(rest);

        if let Some(value) = bracketed_value(&text, "UIDVALIDITY") {
            items.insert("UIDVALIDITY".to_string(), value);
        } else if let Some(value) = bracketed_value(&text, "UIDNEXT") {
            items.insert("UIDNEXT".to_string(), value);
        } else if let Some(value) = bracketed_value(&text, "HIGHESTMODSEQ") {
            items.insert("HIGHESTMODSEQ".to_string(), value);
        } else if let Some(value) = bracketed_value(&text, "UNSEEN") {
            items.insert("UNSEEN".to_string(), value);
        } else if let Some(value) = bracketed_value(&text, "CAPABILITY") {
            items.insert("CAPABILITY".to_string(), value);
        } else if starts_with_ignore_case(text.as_bytes(), "FLAGS") {
            if let Some(open) = text.find('(') {
                if let Some(end) = find_matching_paren(text.as_bytes(), open) {
                    items.insert("FLAGS".to_string(), text[open..end].to_string());
                }
            } else if let Some(value) = bracketed_value(&text, "PERMANENTFLAGS") {
                items.insert("PERMANENTFLAGS".to_string(), value);
            }
        } else if let Some(open) = case_insensitive_find(&text, "PERMANENTFLAGS") {
            if let Some(paren) = text[open..].find('(') {
                let paren = open + paren;
                if let Some(end) = find_matching_paren(text.as_bytes(), paren) {
                    items.insert("PERMANENTFLAGS".to_string(), text[paren..end].to_string());
                }
            }
        } else if let Some(n) = trailing_count(&text, "EXISTS") {
            items.insert("EXISTS".to_string(), n.to_string());
        } else if let Some(n) = trailing_count(&text, "RECENT") {
            items.insert("RECENT".to_string(), n.to_string());
        }
    }

    let access_mode = envelope
        .message
        .as_deref()
        .and_then(access_mode_from_code)
        .unwrap_or(if envelope.command == crate::command::CommandKind::Examine {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        });

    Ok(Payload::SelectedMailbox {
        mailbox,
        access_mode,
        items,
    })
}

fn access_mode_from_code(message: &str) -> Option<AccessMode> {
    if case_insensitive_find(message, "[READ-ONLY]").is_some() {
        Some(AccessMode::ReadOnly)
    } else if case_insensitive_find(message, "[READ-WRITE]").is_some() {
        Some(AccessMode::ReadWrite)
    } else {
        None
    }
}

/// `SEARCH`: the whitespace-separated decimal indices on every `* SEARCH` line.
pub fn parse_search(envelope: &Envelope<'_>) -> Result<Payload> {
    let mut indices = Vec::new();
    for line in &envelope.untagged {
        let body = strip_eol(line);
        let Some(rest) = strip_keyword(body, "SEARCH") else {
            continue;
        };
        for token in rest.split(|&b| b == b' ') {
            if token.is_empty() {
                continue;
            }
            if let Ok(n) = std::str::from_utf8(token).unwrap_or_default().parse::<u64>() {
                indices.push(n);
            }
        }
    }
    Ok(Payload::Search(indices))
}

/// `LIST`/`LSUB`: one entry per untagged line, each `{attributes,
/// delimiter, mailbox}`.
pub fn parse_mailbox_list(envelope: &Envelope<'_>) -> Result<Payload> {
    let mut entries = Vec::new();
    for line in &envelope.untagged {
        let body = strip_eol(line);
        let text = String::from_utf8_lossy(body);

        let Some(paren_start) = text.find('(') else {
            continue;
        };
        let Some(paren_end) = find_matching_paren(text.as_bytes(), paren_start) else {
            continue;
        };
        let attributes: Vec<String> = text[paren_start + 1..paren_end - 1]
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let after_attrs = &text[paren_end..];
        let delimiter = after_attrs
            .find('"')
            .and_then(|q| after_attrs[q + 1..].chars().next())
            .filter(|&c| c != '"');

        let mailbox = last_token_unquoted_or_quoted(after_attrs);

        entries.push(MailboxListEntry {
            attributes,
            delimiter,
            mailbox,
        });
    }
    Ok(Payload::MailboxList(entries))
}

/// `STATUS`: `* STATUS <mailbox> ( KEY VAL KEY VAL ... )`.
pub fn parse_status(envelope: &Envelope<'_>) -> Result<Payload> {
    let mut mailbox = String::new();
    let mut items = HashMap::new();

    for line in &envelope.untagged {
        let body = strip_eol(line);
        let Some(rest) = strip_keyword(body, "STATUS") else {
            continue;
        };
        let text = String::from_utf8_lossy(rest);
        let Some(paren_start) = text.find('(') else {
            continue;
        };
        mailbox = text[..paren_start].trim().trim_matches('"').to_string();

        let Some(paren_end) = find_matching_paren(text.as_bytes(), paren_start) else {
            continue;
        };
        let inner = &text[paren_start + 1..paren_end - 1];
        let mut tokens = inner.split_whitespace();
        while let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
            items.insert(key.to_uppercase(), value.to_string());
        }
    }

    Ok(Payload::Status { mailbox, items })
}

/// `EXPUNGE` (and `CLOSE`, which shares the grammar): every `EXISTS` and
/// `EXPUNGE` count, in order.
pub fn parse_expunge(envelope: &Envelope<'_>) -> Payload {
    let mut exists = Vec::new();
    let mut expunged = Vec::new();

    for line in &envelope.untagged {
        let body = strip_eol(line);
        let text = String::from_utf8_lossy(body);
        if let Some(n) = trailing_count(&text, "EXISTS") {
            exists.push(n);
        } else if let Some(n) = trailing_count(&text, "EXPUNGE") {
            expunged.push(n);
        }
    }

    Payload::Expunge { exists, expunged }
}

/// `STORE`: every untagged `FETCH` line yields `{index, flags}`.
pub fn parse_store(envelope: &Envelope<'_>) -> Result<Payload> {
    let mut results = Vec::new();

    for line in &envelope.untagged {
        let body = strip_eol(line);
        let text = String::from_utf8_lossy(body);
        if case_insensitive_find(&text, "FETCH").is_none() {
            continue;
        }

        let Some(rest) = body.strip_prefix(b"* ") else {
            continue;
        };
        let rest_text = String::from_utf8_lossy(rest);
        let index: u64 = rest_text
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse().ok())
            .unwrap_or(0);

        let Some(flags_at) = case_insensitive_find(&text, "FLAGS ") else {
            continue;
        };
        let after_flags = &text[flags_at + "FLAGS ".len()..];
        let Some(open) = after_flags.find('(') else {
            continue;
        };
        let Some(end) = find_matching_paren(after_flags.as_bytes(), open) else {
            continue;
        };

        results.push(StoreResult {
            index,
            flags: after_flags[open..end].to_string(),
        });
    }

    Ok(Payload::Store(results))
}

/// `CAPABILITY`: the text after the `* CAPABILITY ` prefix, concatenated
/// across every untagged line that carries it.
pub fn parse_capability(envelope: &Envelope<'_>) -> Payload {
    let mut out = String::new();
    for line in &envelope.untagged {
        let body = strip_eol(line);
        let text = String::from_utf8_lossy(body);
        if let Some(idx) = case_insensitive_find(&text, "CAPABILITY ") {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text[idx + "CAPABILITY ".len()..].trim());
        }
    }
    Payload::Capability(out)
}

/// `NOOP`/`IDLE`: every untagged line, verbatim.
pub fn parse_lines(envelope: &Envelope<'_>) -> Payload {
    Payload::Lines(
        envelope
            .untagged
            .iter()
            .map(|line| String::from_utf8_lossy(strip_eol(line)).into_owned())
            .collect(),
    )
}

/// `LOGOUT`: the untagged lines verbatim (`bye_seen` is already latched by
/// [`super::build_envelope`]).
pub fn parse_logout(envelope: &Envelope<'_>) -> Payload {
    Payload::Logout(
        envelope
            .untagged
            .iter()
            .map(|line| String::from_utf8_lossy(strip_eol(line)).into_owned())
            .collect(),
    )
}

/// Extracts the bracketed integer value for `* OK [<keyword> <n>]...` style
/// response codes, e.g. `bracketed_value("* OK [UIDNEXT 4392] ...", "UIDNEXT")`
/// `== Some("4392")`.
fn bracketed_value(text: &str, keyword: &str) -> Option<String> {
    let idx = case_insensitive_find(text, &format!("[{keyword} "))?;
    let after = &text[idx + keyword.len() + 2..];
    let end = after.find(']')?;
    Some(after[..end].trim().to_string())
}

/// Returns the untagged number immediately preceding `keyword` on a line
/// like `* 172 EXISTS`.
fn trailing_count(text: &str, keyword: &str) -> Option<u64> {
    let rest = strip_star_prefix(text)?;
    let mut parts = rest.split_whitespace();
    let n: u64 = parts.next()?.parse().ok()?;
    let kw = parts.next()?;
    kw.eq_ignore_ascii_case(keyword).then_some(n)
}

fn strip_star_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("* ")
}

/// Strips `"* <keyword> "` (case-insensitively) from a raw untagged line,
/// returning the remainder, e.g. `strip_keyword(b"* STATUS INBOX (...)",
/// "STATUS")` returns `b"INBOX (...)"`.
fn strip_keyword<'a>(body: &'a [u8], keyword: &str) -> Option<&'a [u8]> {
    let rest = body.strip_prefix(b"* ")?;
    if starts_with_ignore_case(rest, keyword) {
        let rest = &rest[keyword.len()..];
        Some(rest.strip_prefix(b" ").unwrap_or(rest))
    } else {
        None
    }
}

/// Case-insensitive substring search, returning the byte offset of the
/// first match.
fn case_insensitive_find(haystack: &str, needle: &str) -> Option<usize> {
    let haystack_lower = haystack.to_ascii_uppercase();
    let needle_upper = needle.to_ascii_uppercase();
    haystack_lower.find(&needle_upper)
}

/// Takes the last whitespace-separated token of `line`, stripping a pair of
/// surrounding double quotes if present (the `SELECT`/`EXAMINE` mailbox-name
/// extraction rule).
fn last_token_unquoted(line: &str) -> String {
    line.split_whitespace()
        .next_back()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Like [`last_token_unquoted`] but preserves the quotes (the `LIST`/`LSUB`
/// mailbox-name extraction rule: "if the mailbox name is quoted, preserve
/// the quotes").
fn last_token_unquoted_or_quoted(line: &str) -> String {
    line.split_whitespace().next_back().unwrap_or_default().to_string()
}
