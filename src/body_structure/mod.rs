//! The `BODYSTRUCTURE` tree: a second-stage parser over the parenthesized
//! string a `FETCH ... BODYSTRUCTURE` response carries as one of its item
//! values, plus the pre-order [`walk`] that visitors use to collect
//! information out of the tree (e.g. the built-in [`visitor::Attachment`]
//! extractor).
//!
//! This is a second, independent grammar from the one [`crate::parser`]
//! speaks: by the time a `BODYSTRUCTURE` string reaches [`parse`], the
//! response parser has already pulled it out of the `FETCH` item list as an
//! opaque, balanced parenthesized substring ([`crate::parser::FetchValue::Text`]).

mod visitor;

pub use visitor::{Attachment, AttachmentState, AttachmentVisitor};

use crate::command::CommandKind;
use crate::error::{ParseError, Result};
use crate::wire::{find_matching_paren, find_matching_quote};

/// The sentinel string IMAP uses for an absent body-structure field.
pub const NIL: &str = "NIL";

/// One node of a body-structure tree: either a leaf describing a single
/// MIME part, or a multipart node listing its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    /// Dotted-decimal part number (`"1"`, `"1.2"`, `"2.1.3"`), empty only at
    /// the synthetic root of a single-part message.
    pub part_no: String,
    /// The raw parenthesized substring this node was parsed from.
    pub raw: String,
    /// The node's shape: [`BodyKind::Multipart`] or [`BodyKind::Leaf`].
    pub kind: BodyKind,
}

/// The two shapes a body-structure node can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// A `multipart/*` node: one or more children plus a `SUBTYPE` and an
    /// extension trailer.
    Multipart {
        /// Child parts, in wire order (`part_no` 1-based within this node).
        children: Vec<BodyPart>,
        /// The multipart subtype (`MIXED`, `ALTERNATIVE`, ...).
        subtype: String,
        /// Whatever extension data followed the subtype, verbatim.
        extended: String,
    },
    /// A single MIME part.
    Leaf(LeafPart),
}

/// Fields of a single-part body-structure leaf, in the fixed order the wire
/// grammar presents them. Every field is a string; absent fields
/// carry the [`NIL`] sentinel rather than `Option::None`, matching the wire
/// representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPart {
    /// MIME type (`"TEXT"`, `"APPLICATION"`, ...).
    pub type_: String,
    /// MIME subtype (`"PLAIN"`, `"PDF"`, ...).
    pub subtype: String,
    /// The raw `(key value key value ...)` parameter list, or `"NIL"`.
    pub parameter_list: String,
    /// Content-ID, or `"NIL"`.
    pub id: String,
    /// Content-Description, or `"NIL"`.
    pub description: String,
    /// Content-Transfer-Encoding (`"7BIT"`, `"BASE64"`, ...).
    pub encoding: String,
    /// Body size in octets, as a decimal string.
    pub size: String,
    /// Body size in text lines; only present when `type_` is `"TEXT"`.
    pub text_lines: Option<String>,
    /// Extension field: body MD5, or `"NIL"`.
    pub md5: String,
    /// Extension field: the raw `(disposition-type (attr val ...))` list,
    /// or `"NIL"`. Use [`LeafPart::disposition_params`] to pull fields out
    /// of it.
    pub disposition: String,
    /// Extension field: raw language value (atom, string, or list), or `"NIL"`.
    pub language: String,
    /// Extension field: location URI, or `"NIL"`.
    pub location: String,
    /// Anything past `location` the server sent, verbatim (future
    /// extensions this core doesn't otherwise model).
    pub extended: String,
}

impl LeafPart {
    /// Parses [`Self::parameter_list`] into `(key, value)` pairs
    /// (case-preserving; IMAP parameter names are conventionally
    /// upper-cased but this doesn't enforce it). Returns an empty vector
    /// for `"NIL"` or a malformed list.
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, String)> {
        parse_flat_kv_list(&self.parameter_list)
    }

    /// Parses [`Self::disposition`] into `(disposition-type, params)`,
    /// e.g. `("attachment", [("filename", "report.pdf")])`. Returns `(None,
    /// vec![])` for `"NIL"`.
    #[must_use]
    pub fn disposition_params(&self) -> (Option<String>, Vec<(String, String)>) {
        if self.disposition.eq_ignore_ascii_case(NIL) {
            return (None, Vec::new());
        }
        let bytes = self.disposition.as_bytes();
        let Some(open) = bytes.iter().position(|&b| b == b'(') else {
            return (None, Vec::new());
        };
        let mut pos = open + 1;
        let Some((dsp_type, next)) = read_field(bytes, pos) else {
            return (None, Vec::new());
        };
        pos = next;
        let params = read_field(bytes, pos)
            .map(|(list, _)| parse_flat_kv_list(&list))
            .unwrap_or_default();
        (Some(dsp_type), params)
    }
}

/// Parses a `BODYSTRUCTURE` string into a tree, rooted with an empty
/// `part_no`.
///
/// # Errors
///
/// Returns [`crate::error::Error::Parse`] if `raw` isn't a well-formed
/// balanced parenthesized list, a leaf is missing one of its seven
/// mandatory fields, or a multipart node has zero children.
pub fn parse(raw: &str) -> Result<BodyPart> {
    parse_node(raw.trim(), "")
}

/// Pre-order walk over a body-structure tree: `visitor` is invoked exactly
/// once per part (multipart nodes and leaves alike), receiving the parent
/// node (`None` at the root) and the part itself. The visitor may mutate
/// `state`; the tree is never modified.
pub fn walk<S>(root: &BodyPart, visitor: &mut impl Visitor<S>, state: &mut S) {
    walk_inner(None, root, visitor, state);
}

fn walk_inner<S>(
    parent: Option<&BodyPart>,
    node: &BodyPart,
    visitor: &mut impl Visitor<S>,
    state: &mut S,
) {
    visitor.visit(parent, node, state);
    if let BodyKind::Multipart { children, .. } = &node.kind {
        for child in children {
            walk_inner(Some(node), child, visitor, state);
        }
    }
}

/// A body-structure tree visitor, invoked once per part in pre-order.
pub trait Visitor<S> {
    /// Called for every part. `parent` is `None` only for the root.
    fn visit(&mut self, parent: Option<&BodyPart>, part: &BodyPart, state: &mut S);
}

fn parse_node(raw: &str, part_no: &str) -> Result<BodyPart> {
    let bytes = raw.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(fail(raw, "body-structure node must start with '('"));
    }
    let end = find_matching_paren(bytes, 0).ok_or_else(|| fail(raw, "unbalanced parenthesis"))?;
    let inner = &bytes[1..end - 1];

    let first_non_ws = skip_ws(inner, 0);
    if inner.get(first_non_ws) == Some(&b'(') {
        parse_multipart(raw, inner, part_no)
    } else {
        parse_leaf(raw, inner, part_no)
    }
}

fn parse_multipart(raw: &str, inner: &[u8], part_no: &str) -> Result<BodyPart> {
    let mut children = Vec::new();
    let mut pos = 0usize;
    let mut index = 1usize;

    loop {
        pos = skip_ws(inner, pos);
        if inner.get(pos) != Some(&b'(') {
            break;
        }
        let child_end =
            find_matching_paren(inner, pos).ok_or_else(|| fail(raw, "unbalanced child part"))?;
        let child_raw = std::str::from_utf8(&inner[pos..child_end])
            .map_err(|_| fail(raw, "non-UTF-8 body-structure part"))?;
        let child_no = child_part_no(part_no, index);
        children.push(parse_node(child_raw, &child_no)?);
        index += 1;
        pos = child_end;
    }

    if children.is_empty() {
        return Err(fail(raw, "multipart node has no children"));
    }

    let (subtype, pos) =
        read_field(inner, pos).ok_or_else(|| fail(raw, "multipart node missing subtype"))?;
    let extended = String::from_utf8_lossy(&inner[pos..]).trim().to_string();

    Ok(BodyPart {
        part_no: part_no.to_string(),
        raw: raw.to_string(),
        kind: BodyKind::Multipart {
            children,
            subtype,
            extended,
        },
    })
}

fn parse_leaf(raw: &str, inner: &[u8], part_no: &str) -> Result<BodyPart> {
    let mut pos = 0usize;
    let mut next = |pos: &mut usize, what: &str| -> Result<String> {
        let (value, new_pos) = read_field(inner, *pos).ok_or_else(|| fail(raw, format!("leaf missing {what}")))?;
        *pos = new_pos;
        Ok(value)
    };

    let type_ = next(&mut pos, "type")?;
    let subtype = next(&mut pos, "subtype")?;
    let parameter_list = next(&mut pos, "parameter list")?;
    let id = next(&mut pos, "id")?;
    let description = next(&mut pos, "description")?;
    let encoding = next(&mut pos, "encoding")?;
    let size = next(&mut pos, "size")?;

    let text_lines = if type_.eq_ignore_ascii_case("TEXT") {
        Some(next(&mut pos, "text lines")?)
    } else {
        None
    };

    let mut extras = Vec::new();
    while let Some((value, new_pos)) = read_field(inner, pos) {
        extras.push(value);
        pos = new_pos;
    }
    let mut extras = extras.into_iter();
    let md5 = extras.next().unwrap_or_else(|| NIL.to_string());
    let disposition = extras.next().unwrap_or_else(|| NIL.to_string());
    let language = extras.next().unwrap_or_else(|| NIL.to_string());
    let location = extras.next().unwrap_or_else(|| NIL.to_string());
    let extended = extras.collect::<Vec<_>>().join(" ");

    Ok(BodyPart {
        part_no: part_no.to_string(),
        raw: raw.to_string(),
        kind: BodyKind::Leaf(LeafPart {
            type_,
            subtype,
            parameter_list,
            id,
            description,
            encoding,
            size,
            text_lines,
            md5,
            disposition,
            language,
            location,
            extended,
        }),
    })
}

/// Reads one field starting at `buf[pos]`: a quoted string (unescaped and
/// unquoted), a parenthesized list (kept whole, parens included), or a bare
/// atom/number/`NIL` token. Returns `None` at the end of the field list.
fn read_field(buf: &[u8], pos: usize) -> Option<(String, usize)> {
    let pos = skip_ws(buf, pos);
    match buf.get(pos)? {
        b')' => None,
        b'"' => {
            let end = find_matching_quote(buf, pos)?;
            let content = String::from_utf8_lossy(&buf[pos + 1..end - 1]).into_owned();
            Some((content, end))
        }
        b'(' => {
            let end = find_matching_paren(buf, pos)?;
            Some((String::from_utf8_lossy(&buf[pos..end]).into_owned(), end))
        }
        _ => {
            let start = pos;
            let mut i = pos;
            while i < buf.len() && !matches!(buf[i], b' ' | b')') {
                i += 1;
            }
            if i == start {
                return None;
            }
            Some((String::from_utf8_lossy(&buf[start..i]).into_owned(), i))
        }
    }
}

/// Parses a flat `(key value key value ...)` list (or `"NIL"`) into pairs.
fn parse_flat_kv_list(raw: &str) -> Vec<(String, String)> {
    if raw.eq_ignore_ascii_case(NIL) {
        return Vec::new();
    }
    let bytes = raw.as_bytes();
    let Some(open) = bytes.iter().position(|&b| b == b'(') else {
        return Vec::new();
    };
    let mut pos = open + 1;
    let mut pairs = Vec::new();
    loop {
        let Some((key, next)) = read_field(bytes, pos) else {
            break;
        };
        pos = next;
        let Some((value, next)) = read_field(bytes, pos) else {
            break;
        };
        pos = next;
        pairs.push((key, value));
    }
    pairs
}

fn child_part_no(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        index.to_string()
    } else {
        format!("{parent}.{index}")
    }
}

fn skip_ws(buf: &[u8], mut pos: usize) -> usize {
    while buf.get(pos) == Some(&b' ') {
        pos += 1;
    }
    pos
}

fn fail(raw: &str, message: impl Into<String>) -> crate::error::Error {
    ParseError::new(CommandKind::Fetch, message.into(), raw.to_string()).into()
}
