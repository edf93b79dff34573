//! `WaitForMailBoxEvent`: connects, selects a mailbox, then blocks in
//! `IDLE` until the server reports new activity (falling back to a NOOP
//! poll loop for servers that never advertise `IDLE`).
//!
//! ```text
//! cargo run --example wait_for_mailbox_event -- imap.example.com user@example.com hunter2 INBOX
//! ```

use std::env;
use std::time::Duration;

use antik_imap::connection::Config;
use antik_imap::parser::Payload;
use antik_imap::Session;

fn main() -> antik_imap::Result<()> {
    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "imap.example.com".to_string());
    let user = args.next().unwrap_or_else(|| "user@example.com".to_string());
    let password = args.next().unwrap_or_else(|| "password".to_string());
    let mailbox = args.next().unwrap_or_else(|| "INBOX".to_string());

    let config = Config::builder(host)
        .io_timeout(Duration::from_secs(300))
        .build();
    let mut session = Session::connect(&config, &user, &password)?;

    let capabilities = session.execute("CAPABILITY")?;
    let supports_idle = matches!(&capabilities.payload, Payload::Capability(caps) if caps.split_whitespace().any(|c| c.eq_ignore_ascii_case("IDLE")));

    session.execute(&format!("SELECT {mailbox}"))?;

    if supports_idle {
        println!("entering IDLE on {mailbox}, waiting for server activity...");
        let response = session.execute_lenient("IDLE")?;
        print_lines(&response.payload);
    } else {
        println!("server has no IDLE; polling {mailbox} with NOOP");
        loop {
            let response = session.execute("NOOP")?;
            if let Payload::Lines(lines) = &response.payload {
                if !lines.is_empty() {
                    print_lines(&response.payload);
                    break;
                }
            }
            std::thread::sleep(Duration::from_secs(30));
        }
    }

    session.disconnect()?;
    Ok(())
}

fn print_lines(payload: &Payload) {
    if let Payload::Lines(lines) = payload {
        for line in lines {
            println!("{line}");
        }
    }
}
