//! Blocking, literal-aware framing over [`ImapStream`].
//!
//! This is the Transport contract: connect, send a command line, and read
//! the full response blob for a tag (everything up to and including the
//! tagged status line, with any embedded `{N}` literals read byte-exact).
//! No background tasks, no buffering across calls beyond what's needed to
//! find the next CRLF.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, BufReader, Read, Write};

use super::config::{Config, Security};
use super::stream::{ImapStream, connect_plain, connect_tls};
use crate::error::{Result, TransportError};
use crate::wire::{find_crlf, parse_literal_length};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Owns the connection socket and implements the line/literal framing the
/// response parser expects to receive as input.
pub struct Transport {
    reader: BufReader<ImapStream>,
    max_literal_bytes: usize,
}

impl Transport {
    /// Connects per `config.security`: implicit TLS dials straight into a
    /// TLS handshake, `StartTls`/`None` connect in plaintext (the caller is
    /// expected to send `STARTTLS` and call [`Self::upgrade_to_tls`] itself
    /// when `Security::StartTls` is configured).
    pub fn connect(config: &Config) -> Result<Self> {
        let stream = match config.security {
            Security::Implicit => connect_tls(&config.host, config.port)?,
            Security::StartTls | Security::None => connect_plain(&config.host, config.port)?,
        };
        stream
            .tcp_stream()
            .set_read_timeout(Some(config.io_timeout))
            .map_err(TransportError::Io)?;
        stream
            .tcp_stream()
            .set_nodelay(true)
            .map_err(TransportError::Io)?;

        Ok(Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            max_literal_bytes: config.max_literal_bytes,
        })
    }

    /// Wraps an already-connected stream (used for tests and for the
    /// `STARTTLS` upgrade path, where the caller already holds a stream).
    #[must_use]
    pub fn from_stream(stream: ImapStream, max_literal_bytes: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            max_literal_bytes,
        }
    }

    /// Upgrades the underlying connection to TLS, for `STARTTLS`. Consumes
    /// `self` because the buffered reader can't be rebuilt in place; callers
    /// store `Option<Transport>` and `take()` it across the call (see
    /// [`crate::session::Session`]).
    pub fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        let max_literal_bytes = self.max_literal_bytes;
        let plain = self.reader.into_inner();
        let tls = plain.upgrade_to_tls(host)?;
        Ok(Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, tls),
            max_literal_bytes,
        })
    }

    /// Sends one command line, appending the CRLF terminator.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes()).map_err(TransportError::Io)?;
        stream.write_all(b"\r\n").map_err(TransportError::Io)?;
        stream.flush().map_err(TransportError::Io)?;
        Ok(())
    }

    /// Writes a raw literal payload (for `APPEND`), without a trailing CRLF.
    pub fn send_literal(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).map_err(TransportError::Io)?;
        stream.flush().map_err(TransportError::Io)?;
        Ok(())
    }

    /// Reads every line of the response to a tagged command, accumulating
    /// literals inline, until a line tagged with `tag` is seen.
    ///
    /// Returns the whole blob (all untagged lines plus the final tagged
    /// line), CRLF-terminated, exactly as it arrived on the wire -- this is
    /// what the response parser operates on.
    pub fn read_response(&mut self, tag: &str) -> Result<Vec<u8>> {
        let mut blob = Vec::new();

        loop {
            let line = self.read_line_with_literals()?;
            let is_tagged = is_tagged_for(&line, tag);
            blob.extend_from_slice(&line);
            if is_tagged {
                break;
            }
        }

        Ok(blob)
    }

    /// Reads a single logical line: the bytes up to and including the next
    /// CRLF, followed by the literal payload if the line ends in `{N}` or
    /// `{N+}`, which is itself followed by another CRLF-terminated tail.
    fn read_line_with_literals(&mut self) -> Result<Vec<u8>> {
        let mut line = self.read_crlf_line()?;

        while let Some(declared) = parse_literal_length(&line) {
            if declared > self.max_literal_bytes {
                return Err(TransportError::LiteralTooLarge {
                    declared,
                    limit: self.max_literal_bytes,
                }
                .into());
            }
            let mut literal = vec![0u8; declared];
            self.reader
                .read_exact(&mut literal)
                .map_err(TransportError::Io)?;
            line.extend_from_slice(&literal);

            let tail = self.read_crlf_line()?;
            line.extend_from_slice(&tail);
        }

        Ok(line)
    }

    fn read_crlf_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let buf = self.reader.fill_buf_compat()?;
            if buf.is_empty() {
                return Err(TransportError::UnexpectedEof {
                    tag: String::new(),
                }
                .into());
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);
        }
    }

    /// Closes the underlying socket. The IMAP-level session logic (sending
    /// `LOGOUT` first) lives in [`crate::session::Session`]; this just
    /// releases the OS resource.
    pub fn close(self) -> Result<()> {
        let stream = self.reader.into_inner();
        let _ = stream.tcp_stream().shutdown(std::net::Shutdown::Both);
        Ok(())
    }
}

/// `BufRead::fill_buf` via an explicit trampoline so `read_crlf_line` can
/// call it without pulling `std::io::BufRead` into scope at every call site
/// (it also needs `Read`/`Write` on the same type, which collide on method
/// resolution if both traits are imported widely).
trait FillBufCompat {
    fn fill_buf_compat(&mut self) -> Result<&[u8]>;
    fn consume(&mut self, amt: usize);
}

impl FillBufCompat for BufReader<ImapStream> {
    fn fill_buf_compat(&mut self) -> Result<&[u8]> {
        io::BufRead::fill_buf(self).map_err(TransportError::Io).map_err(Into::into)
    }

    fn consume(&mut self, amt: usize) {
        io::BufRead::consume(self, amt);
    }
}

/// Returns true if `line` is a tagged response for `tag` (i.e. starts with
/// `"<tag> "`).
fn is_tagged_for(line: &[u8], tag: &str) -> bool {
    line.get(..tag.len()).is_some_and(|prefix| prefix == tag.as_bytes())
        && line.get(tag.len()).is_some_and(|&b| b == b' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_over(data: &[u8]) -> Transport {
        Transport {
            reader: BufReader::new(ImapStream::Plain(loopback_with(data))),
            max_literal_bytes: 1024,
        }
    }

    /// Spins up a local TCP loopback pre-seeded with `data` so tests can
    /// exercise `Transport` without mocking `Read`/`Write` at the trait
    /// level (`ImapStream` only wraps concrete socket types).
    fn loopback_with(data: &[u8]) -> std::net::TcpStream {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let data = data.to_vec();
        let writer = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().expect("accept");
            sock.write_all(&data).expect("write");
        });
        let client = std::net::TcpStream::connect(addr).expect("connect");
        writer.join().expect("writer thread");
        client
    }

    #[test]
    fn parses_literal_suffix() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
    }

    #[test]
    fn detects_tagged_line() {
        assert!(is_tagged_for(b"A0001 OK done\r\n", "A0001"));
        assert!(!is_tagged_for(b"A00011 OK done\r\n", "A0001"));
        assert!(!is_tagged_for(b"* OK hi\r\n", "A0001"));
    }

    #[test]
    fn reads_response_with_embedded_literal() {
        let wire = b"* 12 FETCH (BODY[TEXT] {5}\r\nhello)\r\nA0001 OK FETCH completed\r\n";
        let mut transport = transport_over(wire);
        let blob = transport.read_response("A0001").unwrap();
        assert_eq!(blob, wire.to_vec());
    }
}
