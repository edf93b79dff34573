//! End-to-end scenarios against a loopback socket: issuer writes a tagged
//! command, a scripted "server" thread writes back a canned response, and
//! the result is run through [`antik_imap::parser::parse`]. These mirror
//! the worked examples for each command kind, plus a multipart
//! `BODYSTRUCTURE` walked with the built-in attachment visitor.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use antik_imap::body_structure::{self, AttachmentState, AttachmentVisitor};
use antik_imap::connection::{ImapStream, Transport};
use antik_imap::parser::{self, AccessMode, Payload, ResponseStatus};
use antik_imap::{CommandKind, Issuer};

/// Starts a loopback TCP server that writes `reply` as soon as it accepts a
/// connection (it doesn't need to read anything first: the client always
/// writes its command before reading the response, so the bytes are
/// already queued by the time `read_response` runs).
fn server_with_reply(reply: &'static [u8]) -> (TcpStream, std::thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = std::thread::spawn(move || {
        let (mut sock, _) = listener.accept().expect("accept");
        let mut discard = [0u8; 4096];
        let _ = sock.read(&mut discard);
        sock.write_all(reply).expect("write reply");
    });
    let client = TcpStream::connect(addr).expect("connect");
    (client, handle)
}

#[test]
fn select_ok_reports_access_mode_and_items() {
    let (client, handle) = server_with_reply(
        b"* 172 EXISTS\r\n\
          * 1 RECENT\r\n\
          * OK [UNSEEN 12]\r\n\
          * OK [UIDVALIDITY 3857529045]\r\n\
          * OK [UIDNEXT 4392]\r\n\
          * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
          A0001 OK [READ-WRITE] SELECT completed\r\n",
    );

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();
    let issued = issuer.send(&mut transport, "SELECT INBOX").expect("send");
    assert_eq!(issued.kind, CommandKind::Select);

    let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
        .expect("parse");
    assert_eq!(response.status, ResponseStatus::Ok);

    let Payload::SelectedMailbox {
        mailbox,
        access_mode,
        items,
    } = response.payload
    else {
        panic!("expected SelectedMailbox payload");
    };

    assert_eq!(mailbox, "INBOX");
    assert_eq!(access_mode, AccessMode::ReadWrite);
    assert_eq!(items.get("EXISTS").map(String::as_str), Some("172"));
    assert_eq!(items.get("RECENT").map(String::as_str), Some("1"));
    assert_eq!(items.get("UNSEEN").map(String::as_str), Some("12"));
    assert_eq!(items.get("UIDVALIDITY").map(String::as_str), Some("3857529045"));
    assert_eq!(items.get("UIDNEXT").map(String::as_str), Some("4392"));
    assert_eq!(
        items.get("FLAGS").map(String::as_str),
        Some("(\\Answered \\Flagged \\Deleted \\Seen \\Draft)")
    );

    handle.join().expect("server thread");
}

#[test]
fn search_collects_ordered_indices() {
    let (client, handle) = server_with_reply(b"* SEARCH 2 84 882\r\nA0001 OK SEARCH completed\r\n");

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();
    let issued = issuer
        .send(&mut transport, "SEARCH 1:* SINCE 1-Jan-2024")
        .expect("send");

    let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
        .expect("parse");
    assert_eq!(response.status, ResponseStatus::Ok);
    assert_eq!(response.payload, Payload::Search(vec![2, 84, 882]));

    handle.join().expect("server thread");
}

#[test]
fn fetch_with_embedded_literal_keys_by_full_prefix_line() {
    let (client, handle) = server_with_reply(
        b"* 1 FETCH (RFC822.SIZE 44827 BODY[HEADER] {13}\r\nfrom: a@b.c\r\n)\r\nA0001 OK FETCH completed\r\n",
    );

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();
    let issued = issuer
        .send(&mut transport, "FETCH 1 (RFC822.SIZE BODY[HEADER])")
        .expect("send");

    let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
        .expect("parse");
    assert_eq!(response.status, ResponseStatus::Ok);

    let Payload::Fetch(entries) = response.payload else {
        panic!("expected Fetch payload");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].index, 1);

    use antik_imap::parser::FetchValue;
    assert_eq!(
        entries[0].items.get("RFC822.SIZE"),
        Some(&FetchValue::Number(44827))
    );
    let literal_key = "* 1 FETCH (RFC822.SIZE 44827 BODY[HEADER]";
    assert_eq!(
        entries[0].items.get(literal_key),
        Some(&FetchValue::Literal(b"from: a@b.c\r\n".to_vec()))
    );

    handle.join().expect("server thread");
}

#[test]
fn status_parses_mailbox_and_item_map() {
    let (client, handle) = server_with_reply(
        b"* STATUS INBOX (MESSAGES 231 UIDNEXT 44292)\r\nA0001 OK STATUS completed\r\n",
    );

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();
    let issued = issuer
        .send(&mut transport, "STATUS INBOX (MESSAGES UIDNEXT)")
        .expect("send");

    let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
        .expect("parse");

    let Payload::Status { mailbox, items } = response.payload else {
        panic!("expected Status payload");
    };
    assert_eq!(mailbox, "INBOX");
    assert_eq!(items.get("MESSAGES").map(String::as_str), Some("231"));
    assert_eq!(items.get("UIDNEXT").map(String::as_str), Some("44292"));

    handle.join().expect("server thread");
}

#[test]
fn logout_sets_bye_seen() {
    let (client, handle) =
        server_with_reply(b"* BYE IMAP4rev1 Server logging out\r\nA0001 OK LOGOUT completed\r\n");

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();
    let issued = issuer.send(&mut transport, "LOGOUT").expect("send");

    let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
        .expect("parse");
    assert!(response.bye_seen);
    assert_eq!(response.status, ResponseStatus::Ok);

    let Payload::Logout(lines) = response.payload else {
        panic!("expected Logout payload");
    };
    assert!(!lines.is_empty());

    handle.join().expect("server thread");
}

#[test]
fn tags_are_unique_across_successive_commands_on_one_session() {
    let (client, handle) = server_with_reply(
        b"A0001 OK NOOP completed\r\nA0002 OK NOOP completed\r\nA0003 OK NOOP completed\r\n",
    );

    let mut transport = Transport::from_stream(ImapStream::plain(client), 1 << 20);
    let mut issuer = Issuer::new();

    let tags: Vec<String> = (0..3)
        .map(|_| issuer.send(&mut transport, "NOOP").expect("send").tag)
        .collect();

    let mut unique = tags.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), tags.len(), "expected all tags distinct: {tags:?}");

    handle.join().expect("server thread");
}

#[test]
fn body_structure_multipart_walks_to_an_attachment() {
    let raw = r#"(("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "7BIT" 1152 23) ("APPLICATION" "OCTET-STREAM" ("NAME" "cc.diff") "<960723163407.20117h@cac.washington.edu>" "Compiler diff" "BASE64" 4554 73) "MIXED")"#;

    let root = body_structure::parse(raw).expect("parse body structure");
    let antik_imap::body_structure::BodyKind::Multipart {
        children, subtype, ..
    } = &root.kind
    else {
        panic!("expected multipart root");
    };
    assert_eq!(subtype, "MIXED");
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].part_no, "1");
    assert_eq!(children[1].part_no, "2");

    let mut state = AttachmentState::default();
    body_structure::walk(&root, &mut AttachmentVisitor, &mut state);
    assert_eq!(state.attachments.len(), 1);
    assert_eq!(state.attachments[0].part_no, "2");
    assert_eq!(state.attachments[0].file_name.as_deref(), Some("cc.diff"));
    assert_eq!(state.attachments[0].size, "4554");
}
