//! The session facade: the thin orchestrator callers actually hold.
//!
//! `Session` wires together [`crate::connection::Transport`] and
//! [`crate::issuer::Issuer`] behind `connect`/`send_command`/`execute`/
//! `disconnect`. It owns no background tasks -- every method runs to
//! completion on the caller's thread, single-threaded and blocking
//! throughout.

use crate::command;
use crate::connection::{Config, Security, Transport};
use crate::error::{Error, Result};
use crate::issuer::{IssuedCommand, Issuer};
use crate::parser::{self, Response, ResponseStatus};

/// A connected, authenticated IMAP session.
///
/// Obtained via [`Session::connect`]. Every method that talks to the server
/// takes `&mut self`: a session is not `Sync` in any useful sense -- a
/// session owns its transport exclusively and concurrent use from multiple
/// threads is undefined.
pub struct Session {
    transport: Option<Transport>,
    issuer: Issuer,
    host: String,
}

impl Session {
    /// Connects to `config.host:config.port`, performs a `STARTTLS` upgrade
    /// first if `config.security` is [`Security::StartTls`], then logs in
    /// with `user`/`password`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TCP connect, TLS handshake, or
    /// any read/write fails; [`Error::Parse`] if a response is malformed;
    /// [`Error::Protocol`] if `STARTTLS` or `LOGIN` is answered `NO`/`BAD`.
    pub fn connect(config: &Config, user: &str, password: &str) -> Result<Self> {
        let transport = Transport::connect(config)?;
        let mut session = Self {
            transport: Some(transport),
            issuer: Issuer::new(),
            host: config.host.clone(),
        };

        if config.security == Security::StartTls {
            session.execute("STARTTLS")?;
            let upgraded = session.take_transport()?.upgrade_to_tls(&session.host)?;
            session.transport = Some(upgraded);
        }

        session.execute(&command::login_line(user, password))?;
        Ok(session)
    }

    /// Issues `command_text` (without tag or CRLF) and returns the raw
    /// response blob plus the tag/kind it was dispatched under. The caller
    /// is expected to pass [`IssuedCommand::response`] to [`parser::parse`]
    /// itself; use [`Self::execute`] for the common case of wanting a typed
    /// [`Response`] with non-OK statuses raised as [`Error::Protocol`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the write or the read fails.
    pub fn send_command(&mut self, command_text: &str) -> Result<IssuedCommand> {
        let transport = self.transport.as_mut().ok_or_else(broken_session)?;
        self.issuer.send(transport, command_text)
    }

    /// Issues `command_text`, parses the response, and raises
    /// [`Error::Protocol`] if the server answered anything other than `OK`.
    ///
    /// This is the "raise on non-OK" mode: [`Error::Protocol`]
    /// is never produced by [`parser::parse`] itself, only here.
    ///
    /// # Errors
    ///
    /// As [`Self::send_command`], plus [`Error::Parse`] if the response
    /// doesn't match the grammar for the dispatched command kind, and
    /// [`Error::Protocol`] if the server answered `NO`/`BAD`.
    pub fn execute(&mut self, command_text: &str) -> Result<Response> {
        let issued = self.send_command(command_text)?;
        let response = parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)?;
        if response.status != ResponseStatus::Ok {
            return Err(Error::Protocol {
                status: response.status,
                message: response.message.unwrap_or_default(),
            });
        }
        Ok(response)
    }

    /// Issues `command_text` and returns the parsed response regardless of
    /// status -- the `NO`/`BAD` case is left for the caller to inspect via
    /// [`Response::status`], rather than raised as [`Error::Protocol`].
    ///
    /// # Errors
    ///
    /// As [`Self::send_command`], plus [`Error::Parse`].
    pub fn execute_lenient(&mut self, command_text: &str) -> Result<Response> {
        let issued = self.send_command(command_text)?;
        parser::parse(&issued.response, &issued.tag, issued.kind, &issued.line)
    }

    /// Issues `LOGOUT` and closes the transport. Idempotent with respect to
    /// the socket: a transport that is already gone (e.g. a prior command
    /// failed fatally) is treated as already disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the `LOGOUT` write/read or the socket
    /// shutdown fails. The session should be dropped either way; a failure
    /// here does not leave the transport usable.
    pub fn disconnect(mut self) -> Result<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        let tag = self.issuer.send(&mut transport, "LOGOUT").map(|_| ());
        transport.close()?;
        tag
    }

    /// Returns `true` once an untagged `BYE` has been observed by `execute`
    /// or `execute_lenient` is re-run against the session's last response --
    /// callers that need to track this across commands should inspect
    /// [`Response::bye_seen`] on each returned value directly; this session
    /// type does not cache it.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    fn take_transport(&mut self) -> Result<Transport> {
        self.transport.take().ok_or_else(broken_session)
    }
}

fn broken_session() -> Error {
    crate::error::TransportError::InvalidState("session has no active transport".to_string()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::ImapStream;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    /// Spins up a loopback "server" thread that reads whatever the client
    /// sends and writes back a scripted reply for each line it receives, in
    /// order. Good enough for exercising the synchronous command/response
    /// pattern without a real IMAP server.
    fn scripted_server(replies: Vec<&'static [u8]>) -> (TcpStream, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            for reply in replies {
                let _ = sock.read(&mut buf).unwrap();
                sock.write_all(reply).unwrap();
            }
        });
        let client = TcpStream::connect(addr).unwrap();
        (client, handle)
    }

    #[test]
    fn execute_raises_protocol_error_on_no_status() {
        let (client, handle) = scripted_server(vec![b"A0001 NO no such mailbox\r\n"]);
        let mut session = Session {
            transport: Some(Transport::from_stream(ImapStream::plain(client), 1024)),
            issuer: Issuer::new(),
            host: "localhost".to_string(),
        };

        let err = session.execute("SELECT Nonexistent").unwrap_err();
        assert!(matches!(err, Error::Protocol { status, .. } if status == ResponseStatus::No));

        handle.join().unwrap();
    }

    #[test]
    fn execute_lenient_returns_non_ok_without_erroring() {
        let (client, handle) = scripted_server(vec![b"A0001 BAD unknown command\r\n"]);
        let mut session = Session {
            transport: Some(Transport::from_stream(ImapStream::plain(client), 1024)),
            issuer: Issuer::new(),
            host: "localhost".to_string(),
        };

        let response = session.execute_lenient("BOGUS").unwrap();
        assert_eq!(response.status, ResponseStatus::Bad);

        handle.join().unwrap();
    }

    #[test]
    fn disconnect_sends_logout_and_closes_transport() {
        let (client, handle) = scripted_server(vec![b"A0001 OK LOGOUT completed\r\n"]);
        let session = Session {
            transport: Some(Transport::from_stream(ImapStream::plain(client), 1024)),
            issuer: Issuer::new(),
            host: "localhost".to_string(),
        };

        session.disconnect().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn disconnect_is_idempotent_once_transport_is_gone() {
        let session = Session {
            transport: None,
            issuer: Issuer::new(),
            host: "localhost".to_string(),
        };
        assert!(session.disconnect().is_ok());
    }
}
