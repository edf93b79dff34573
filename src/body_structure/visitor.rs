//! The built-in attachment extractor: a [`super::Visitor`] that collects
//! every leaf part worth downloading as a standalone file.
//!
//! A part counts as an attachment when it carries a `filename` (in either
//! the `Content-Disposition` parameter list or, failing that, the
//! `Content-Type` parameter list) or isn't `text/*`, and its transfer
//! encoding is `BASE64` -- the other two encodings the core
//! recognizes, `7BIT`/`QUOTED-PRINTABLE`, never carry binary attachments in
//! practice and are left to the caller to fetch and decode by other means.

use super::{BodyKind, BodyPart, Visitor};

/// One discovered attachment: where it lives in the tree, and enough
/// metadata to decide whether and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Dotted part number to pass to a `FETCH BODY[<part_no>]` request.
    pub part_no: String,
    /// Transfer encoding as declared on the wire (always `"BASE64"` for
    /// parts this visitor collects).
    pub encoding: String,
    /// Suggested filename, from the disposition parameter list or, failing
    /// that, the content-type parameter list.
    pub file_name: Option<String>,
    /// `creation-date` disposition parameter, if the server sent one.
    pub creation_date: Option<String>,
    /// `modification-date` disposition parameter, if the server sent one.
    pub modification_date: Option<String>,
    /// Declared body size in octets.
    pub size: String,
    /// MIME type, e.g. `"APPLICATION"`.
    pub mime_type: String,
    /// MIME subtype, e.g. `"PDF"`.
    pub mime_subtype: String,
}

/// Accumulator state for [`AttachmentVisitor`]: the attachments found so
/// far, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentState {
    /// Every attachment found during the walk, in tree order.
    pub attachments: Vec<Attachment>,
}

/// Collects [`Attachment`]s out of a body-structure tree via [`super::walk`].
///
/// ```ignore
/// let mut state = AttachmentState::default();
/// body_structure::walk(&root, &mut AttachmentVisitor, &mut state);
/// for attachment in state.attachments {
///     // issue FETCH BODY[<attachment.part_no>] ...
/// }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct AttachmentVisitor;

impl Visitor<AttachmentState> for AttachmentVisitor {
    fn visit(&mut self, _parent: Option<&BodyPart>, part: &BodyPart, state: &mut AttachmentState) {
        let BodyKind::Leaf(leaf) = &part.kind else {
            return;
        };

        if !leaf.encoding.eq_ignore_ascii_case("BASE64") {
            return;
        }

        let (_, disposition_params) = leaf.disposition_params();
        let disposition_filename = find_param(&disposition_params, "filename");

        let is_text = leaf.type_.eq_ignore_ascii_case("TEXT");
        if disposition_filename.is_none() && is_text {
            return;
        }

        let content_type_filename = find_param(&leaf.parameters(), "name");
        let file_name = disposition_filename.or(content_type_filename);

        state.attachments.push(Attachment {
            part_no: part.part_no.clone(),
            encoding: leaf.encoding.clone(),
            creation_date: find_param(&disposition_params, "creation-date"),
            modification_date: find_param(&disposition_params, "modification-date"),
            file_name,
            size: leaf.size.clone(),
            mime_type: leaf.type_.clone(),
            mime_subtype: leaf.subtype.clone(),
        });
    }
}

fn find_param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::body_structure::parse;

    #[test]
    fn finds_attachment_with_filename_in_disposition() {
        let raw = r#"("APPLICATION" "PDF" ("NAME" "report.pdf") NIL NIL "BASE64" 900 NIL ("attachment" ("filename" "report.pdf")) NIL NIL)"#;
        let root = parse(raw).unwrap();
        let mut state = AttachmentState::default();
        super::super::walk(&root, &mut AttachmentVisitor, &mut state);
        assert_eq!(state.attachments.len(), 1);
        assert_eq!(state.attachments[0].file_name.as_deref(), Some("report.pdf"));
        assert_eq!(state.attachments[0].part_no, "");
    }

    #[test]
    fn skips_plain_text_body_without_filename() {
        let raw = r#"("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "BASE64" 1152 23)"#;
        let root = parse(raw).unwrap();
        let mut state = AttachmentState::default();
        super::super::walk(&root, &mut AttachmentVisitor, &mut state);
        assert!(state.attachments.is_empty());
    }

    #[test]
    fn skips_text_with_content_type_name_but_no_disposition_filename() {
        let raw = r#"("TEXT" "PLAIN" ("NAME" "inline.txt" "CHARSET" "US-ASCII") NIL NIL "BASE64" 1152 23)"#;
        let root = parse(raw).unwrap();
        let mut state = AttachmentState::default();
        super::super::walk(&root, &mut AttachmentVisitor, &mut state);
        assert!(state.attachments.is_empty());
    }

    #[test]
    fn skips_non_base64_encoding_even_with_filename() {
        let raw = r#"("APPLICATION" "PDF" ("NAME" "report.pdf") NIL NIL "7BIT" 900)"#;
        let root = parse(raw).unwrap();
        let mut state = AttachmentState::default();
        super::super::walk(&root, &mut AttachmentVisitor, &mut state);
        assert!(state.attachments.is_empty());
    }

    #[test]
    fn collects_nested_attachment_inside_multipart() {
        let raw = r#"(("TEXT" "PLAIN" NIL NIL NIL "7BIT" 10 1) ("IMAGE" "PNG" ("NAME" "logo.png") NIL NIL "BASE64" 2048) "MIXED")"#;
        let root = parse(raw).unwrap();
        let mut state = AttachmentState::default();
        super::super::walk(&root, &mut AttachmentVisitor, &mut state);
        assert_eq!(state.attachments.len(), 1);
        assert_eq!(state.attachments[0].part_no, "2");
        assert_eq!(state.attachments[0].file_name.as_deref(), Some("logo.png"));
    }
}
