//! `DownloadAllAttachments`: selects a mailbox, fetches the `BODYSTRUCTURE`
//! of every message, walks it with the built-in attachment visitor, and
//! fetches each attachment's part by `BODY[<part_no>]`.
//!
//! ```text
//! cargo run --example download_all_attachments -- imap.example.com user@example.com hunter2 INBOX ./out
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use antik_imap::body_structure::{self, AttachmentState, AttachmentVisitor};
use antik_imap::connection::Config;
use antik_imap::parser::{FetchValue, Payload};
use antik_imap::Session;
use base64::Engine;

fn main() -> antik_imap::Result<()> {
    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "imap.example.com".to_string());
    let user = args.next().unwrap_or_else(|| "user@example.com".to_string());
    let password = args.next().unwrap_or_else(|| "password".to_string());
    let mailbox = args.next().unwrap_or_else(|| "INBOX".to_string());
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    fs::create_dir_all(&out_dir).map_err(|e| {
        antik_imap::Error::Transport(antik_imap::TransportError::Io(e))
    })?;

    let config = Config::new(host);
    let mut session = Session::connect(&config, &user, &password)?;
    session.execute(&format!("SELECT {mailbox}"))?;

    let search = session.execute("SEARCH ALL")?;
    let Payload::Search(indices) = search.payload else {
        session.disconnect()?;
        return Ok(());
    };

    for index in indices {
        let fetched = session.execute(&format!("FETCH {index} (BODYSTRUCTURE)"))?;
        let Payload::Fetch(entries) = fetched.payload else {
            continue;
        };
        let Some(entry) = entries.into_iter().find(|e| e.index == index) else {
            continue;
        };
        let Some(FetchValue::Text(structure)) = entry.items.get("BODYSTRUCTURE").cloned() else {
            continue;
        };

        let root = match body_structure::parse(&structure) {
            Ok(root) => root,
            Err(err) => {
                eprintln!("message {index}: skipping unparsable BODYSTRUCTURE: {err}");
                continue;
            }
        };

        let mut state = AttachmentState::default();
        body_structure::walk(&root, &mut AttachmentVisitor, &mut state);

        for attachment in state.attachments {
            let part = session.execute(&format!(
                "FETCH {index} (BODY[{}])",
                attachment.part_no
            ))?;
            let Payload::Fetch(part_entries) = part.payload else {
                continue;
            };
            let Some(part_entry) = part_entries.into_iter().find(|e| e.index == index) else {
                continue;
            };
            let Some(literal) = part_entry
                .items
                .values()
                .find_map(|v| match v {
                    FetchValue::Literal(bytes) => Some(bytes.clone()),
                    _ => None,
                })
            else {
                continue;
            };

            let decoded = base64::engine::general_purpose::STANDARD
                .decode(strip_whitespace(&literal))
                .unwrap_or(literal);

            let file_name = attachment
                .file_name
                .unwrap_or_else(|| format!("message-{index}-part-{}.bin", attachment.part_no));
            let path = out_dir.join(sanitize(&file_name));
            fs::write(&path, &decoded).map_err(|e| {
                antik_imap::Error::Transport(antik_imap::TransportError::Io(e))
            })?;
            println!("wrote {}", path.display());
        }
    }

    session.disconnect()?;
    Ok(())
}

fn strip_whitespace(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect()
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
