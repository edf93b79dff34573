//! The `FETCH` response routine: the one command grammar complex enough to
//! need its own item-by-item sub-lexer.
//!
//! Each untagged line here has already had any embedded `{N}` literal
//! payload spliced in by [`crate::wire::split_logical_lines`], so the whole
//! `* <n> FETCH ( ... )` response -- including literal octets -- is one
//! contiguous byte slice by the time it reaches [`parse_fetch`].

use std::collections::HashMap;

use super::response::{FetchEntry, FetchValue, Payload};
use super::Envelope;
use crate::error::Result;
use crate::wire::{find_matching_paren, find_matching_quote, parse_literal_length, strip_eol};

/// Parses every `* <n> FETCH (...)` untagged line into a [`FetchEntry`].
pub fn parse_fetch(envelope: &Envelope<'_>) -> Result<Payload> {
    let mut entries = Vec::new();

    for line in &envelope.untagged {
        let body = strip_eol(line);
        let Some(after_star) = body.strip_prefix(b"* ") else {
            continue;
        };

        let Some((index, after_index)) = leading_number(after_star) else {
            continue;
        };
        let after_index = trim_leading_space(after_index);
        let Some(after_fetch) = strip_fetch_keyword(after_index) else {
            continue;
        };
        let after_fetch = trim_leading_space(after_fetch);
        if after_fetch.first() != Some(&b'(') {
            return Err(envelope.fail(
                "FETCH response missing opening parenthesis",
                String::from_utf8_lossy(body).into_owned(),
            ));
        }

        let prefix_len = body.len() - after_fetch.len();
        let items = parse_item_list(envelope, body, prefix_len)?;

        entries.push(FetchEntry { index, items });
    }

    Ok(Payload::Fetch(entries))
}

/// Parses the parenthesized item list of one `FETCH` response, starting at
/// `line[list_start]` (the opening `(`).
fn parse_item_list(
    envelope: &Envelope<'_>,
    line: &[u8],
    list_start: usize,
) -> Result<HashMap<String, FetchValue>> {
    let mut items = HashMap::new();
    // Position just past the opening '('.
    let mut pos = list_start + 1;

    loop {
        pos = skip_item_whitespace(line, pos);
        match line.get(pos) {
            None => {
                return Err(envelope.fail(
                    "FETCH item list never closed",
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            Some(b')') => break,
            Some(_) => {}
        }

        let token_start = pos;
        let token_end = item_token_end(line, pos);
        let token = &line[token_start..token_end];
        let token_upper = String::from_utf8_lossy(token).to_ascii_uppercase();

        pos = token_end;

        if token_upper == "BODYSTRUCTURE"
            || token_upper == "ENVELOPE"
            || token_upper == "FLAGS"
            || token_upper == "BODY"
        {
            let list_pos = skip_item_whitespace(line, pos);
            if line.get(list_pos) != Some(&b'(') {
                return Err(envelope.fail(
                    format!("{token_upper} item missing parenthesized list"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            let Some(end) = find_matching_paren(line, list_pos) else {
                return Err(envelope.fail(
                    format!("{token_upper} item has an unbalanced list"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            };
            let text = String::from_utf8_lossy(&line[list_pos..end]).into_owned();
            items.insert(token_upper, FetchValue::Text(text));
            pos = end;
        } else if token_upper == "INTERNALDATE" {
            let quote_pos = skip_item_whitespace(line, pos);
            if line.get(quote_pos) != Some(&b'"') {
                return Err(envelope.fail(
                    "INTERNALDATE item missing quoted string",
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            let Some(end) = find_matching_quote(line, quote_pos) else {
                return Err(envelope.fail(
                    "INTERNALDATE quoted string never closed",
                    String::from_utf8_lossy(line).into_owned(),
                ));
            };
            let text = String::from_utf8_lossy(&line[quote_pos..end]).into_owned();
            items.insert(token_upper, FetchValue::Text(text));
            pos = end;
        } else if token_upper == "RFC822.SIZE" || token_upper == "UID" {
            let num_pos = skip_item_whitespace(line, pos);
            let num_end = digits_end(line, num_pos);
            if num_end == num_pos {
                return Err(envelope.fail(
                    format!("{token_upper} item missing decimal value"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            let n: u64 = std::str::from_utf8(&line[num_pos..num_end])
                .unwrap_or_default()
                .parse()
                .map_err(|_| {
                    envelope.fail(
                        format!("{token_upper} value is not a valid number"),
                        String::from_utf8_lossy(line).into_owned(),
                    )
                })?;
            items.insert(token_upper, FetchValue::Number(n));
            pos = num_end;
        } else if token_upper.starts_with("RFC822") || token_upper.starts_with("BODY[") {
            let literal_start = skip_item_whitespace(line, pos);
            let line_end = find_crlf_after(line, literal_start);
            let Some(declared_line) = line.get(literal_start..line_end) else {
                return Err(envelope.fail(
                    format!("{token_upper} item missing literal length"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            };
            let Some(declared) = parse_literal_length(declared_line) else {
                return Err(envelope.fail(
                    format!("{token_upper} item missing a {{N}} literal marker"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            };
            let payload_start = line_end;
            let payload_end = payload_start + declared;
            if payload_end > line.len() {
                return Err(envelope.fail(
                    format!("{token_upper} literal declared {declared} bytes past the end of the response"),
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            let key = String::from_utf8_lossy(&line[..token_end]).into_owned();
            let payload = line[payload_start..payload_end].to_vec();
            items.insert(key, FetchValue::Literal(payload));
            pos = payload_end;
        } else {
            return Err(envelope.fail(
                format!("unrecognized FETCH item {token_upper:?}"),
                String::from_utf8_lossy(line).into_owned(),
            ));
        }
    }

    Ok(items)
}

/// Item tokens end at the first space, `(`, or `[`'s matching `]` (section
/// specifiers like `BODY[HEADER.FIELDS (FROM)]` are kept whole).
fn item_token_end(line: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < line.len() {
        match line[i] {
            b' ' | b'(' => break,
            b'[' => {
                // Consume through the matching ']', which may itself
                // contain a parenthesized field-name list.
                let mut depth = 1i32;
                i += 1;
                while i < line.len() && depth > 0 {
                    match line[i] {
                        b'[' => depth += 1,
                        b']' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                // Optional partial-fetch suffix, e.g. `<0.100>`.
                if line.get(i) == Some(&b'<') {
                    while i < line.len() && line[i] != b'>' {
                        i += 1;
                    }
                    if i < line.len() {
                        i += 1;
                    }
                }
                return i;
            }
            _ => i += 1,
        }
    }
    i
}

/// Skips item-list whitespace: plain spaces and embedded `CRLF` (the
/// "empty residual lines advance to the next line" rule -- once a literal's
/// bytes are consumed, any leftover line break before the next item is just
/// more separator).
fn skip_item_whitespace(line: &[u8], mut pos: usize) -> usize {
    while matches!(line.get(pos), Some(b' ' | b'\r' | b'\n')) {
        pos += 1;
    }
    pos
}

fn find_crlf_after(line: &[u8], from: usize) -> usize {
    match line[from..].windows(2).position(|w| w == b"\r\n") {
        Some(rel) => from + rel + 2,
        None => line.len(),
    }
}

fn digits_end(line: &[u8], start: usize) -> usize {
    let mut i = start;
    while line.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    i
}

fn leading_number(buf: &[u8]) -> Option<(u64, &[u8])> {
    let end = digits_end(buf, 0);
    if end == 0 {
        return None;
    }
    let n = std::str::from_utf8(&buf[..end]).ok()?.parse().ok()?;
    Some((n, &buf[end..]))
}

fn trim_leading_space(buf: &[u8]) -> &[u8] {
    buf.strip_prefix(b" ").unwrap_or(buf)
}

fn strip_fetch_keyword(buf: &[u8]) -> Option<&[u8]> {
    if crate::wire::starts_with_ignore_case(buf, "FETCH") {
        Some(&buf[5..])
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::parser::response::ResponseStatus;

    fn envelope<'a>(untagged: Vec<&'a [u8]>) -> Envelope<'a> {
        Envelope {
            command: CommandKind::Fetch,
            status: ResponseStatus::Ok,
            message: Some("completed".to_string()),
            bye_seen: false,
            untagged,
        }
    }

    #[test]
    fn parses_simple_number_and_flags_items() {
        let line: &[u8] = b"* 1 FETCH (UID 99 FLAGS (\\Seen))\r\n";
        let env = envelope(vec![line]);
        let Payload::Fetch(entries) = parse_fetch(&env).unwrap() else {
            unreachable!()
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[0].items.get("UID"), Some(&FetchValue::Number(99)));
        assert_eq!(
            entries[0].items.get("FLAGS"),
            Some(&FetchValue::Text("(\\Seen)".to_string()))
        );
    }

    #[test]
    fn parses_embedded_literal_with_full_prefix_key() {
        // 13 raw octets: "from: a@b.c\r\n".
        let line: &[u8] =
            b"* 1 FETCH (RFC822.SIZE 44827 BODY[HEADER] {13}\r\nfrom: a@b.c\r\n)\r\n";
        let env = envelope(vec![line]);
        let Payload::Fetch(entries) = parse_fetch(&env).unwrap() else {
            unreachable!()
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 1);
        assert_eq!(
            entries[0].items.get("RFC822.SIZE"),
            Some(&FetchValue::Number(44827))
        );
        let key = "* 1 FETCH (RFC822.SIZE 44827 BODY[HEADER]";
        assert_eq!(
            entries[0].items.get(key),
            Some(&FetchValue::Literal(b"from: a@b.c\r\n".to_vec()))
        );
    }

    #[test]
    fn unrecognized_item_aborts_with_parse_error() {
        let line: &[u8] = b"* 1 FETCH (BOGUSITEM foo)\r\n";
        let env = envelope(vec![line]);
        assert!(parse_fetch(&env).is_err());
    }

    #[test]
    fn internaldate_is_read_as_requoted_string() {
        let line: &[u8] = b"* 4 FETCH (INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")\r\n";
        let env = envelope(vec![line]);
        let Payload::Fetch(entries) = parse_fetch(&env).unwrap() else {
            unreachable!()
        };
        assert_eq!(
            entries[0].items.get("INTERNALDATE"),
            Some(&FetchValue::Text(
                "\"17-Jul-1996 02:44:25 -0700\"".to_string()
            ))
        );
    }

    #[test]
    fn multiple_messages_in_one_response() {
        let line1: &[u8] = b"* 1 FETCH (UID 1)\r\n";
        let line2: &[u8] = b"* 2 FETCH (UID 2)\r\n";
        let env = envelope(vec![line1, line2]);
        let Payload::Fetch(entries) = parse_fetch(&env).unwrap() else {
            unreachable!()
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].index, 2);
    }
}
