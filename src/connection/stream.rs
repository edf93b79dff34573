//! Blocking stream types for IMAP connections.
//!
//! The transport is synchronous end to end: a plaintext [`std::net::TcpStream`]
//! that can be upgraded in place to TLS via STARTTLS, or a stream that is
//! TLS from the moment the TCP handshake completes.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, StreamOwned};

use crate::error::{Result, TransportError};

/// A stream that can be either plaintext or TLS.
///
/// Both variants are blocking; all reads and writes run on the calling
/// thread, matching the single-threaded, no-background-tasks concurrency
/// model of the session facade built on top of this type.
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl ImapStream {
    /// Wraps an already-connected plaintext stream.
    pub const fn plain(stream: TcpStream) -> Self {
        Self::Plain(stream)
    }

    /// Wraps an already-established TLS stream.
    pub fn tls(stream: StreamOwned<ClientConnection, TcpStream>) -> Self {
        Self::Tls(Box::new(stream))
    }

    /// Upgrades a plaintext stream to TLS in place (the `STARTTLS` command
    /// sequence: send `STARTTLS`, read the `OK`, then perform the TLS
    /// handshake over the same socket).
    pub fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let config = build_client_config()?;
                let server_name = ServerName::try_from(host.to_string())
                    .map_err(TransportError::InvalidDnsName)?
                    .to_owned();
                let conn =
                    ClientConnection::new(Arc::new(config), server_name).map_err(TransportError::Tls)?;
                Ok(Self::Tls(Box::new(StreamOwned::new(conn, tcp))))
            }
            Self::Tls(_) => Err(TransportError::InvalidState(
                "stream is already TLS".to_string(),
            )
            .into()),
        }
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Returns the underlying plaintext TCP stream, for setting socket
    /// options (e.g. read timeouts) regardless of TLS state.
    #[must_use]
    pub fn tcp_stream(&self) -> &TcpStream {
        match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => tls.get_ref(),
        }
    }
}

impl Read for ImapStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for ImapStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// Builds a `rustls` client configuration trusting the common web root CAs.
///
/// IMAP servers typically present certificates from the same CA pool as
/// HTTPS servers, so `webpki-roots` is reused rather than depending on the
/// platform certificate store.
pub fn build_client_config() -> Result<rustls::ClientConfig> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    Ok(rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

/// Connects to a server with TLS negotiated immediately after the TCP
/// handshake (the "implicit TLS" security mode, typically port 993).
pub fn connect_tls(host: &str, port: u16) -> Result<ImapStream> {
    let tcp = TcpStream::connect((host, port)).map_err(TransportError::Io)?;

    let config = build_client_config()?;
    let server_name = ServerName::try_from(host.to_string())
        .map_err(TransportError::InvalidDnsName)?
        .to_owned();
    let conn = ClientConnection::new(Arc::new(config), server_name).map_err(TransportError::Tls)?;

    Ok(ImapStream::Tls(Box::new(StreamOwned::new(conn, tcp))))
}

/// Connects to a server without TLS, for plaintext sessions or as the first
/// half of a `STARTTLS` upgrade.
pub fn connect_plain(host: &str, port: u16) -> Result<ImapStream> {
    let tcp = TcpStream::connect((host, port)).map_err(TransportError::Io)?;
    Ok(ImapStream::Plain(tcp))
}
