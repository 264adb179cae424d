//! WebSocket opening handshake (RFC 6455 Section 4).
//!
//! Inbound upgrade requests are not fully parsed as HTTP: a read that starts
//! with the `GET` method token is treated as a handshake, and the only header
//! the server extracts is `Sec-WebSocket-Key`. This heuristic is part of the
//! server's contract with its callers.

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wavesock::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Whether an inbound read looks like an HTTP upgrade request rather than a
/// frame.
///
/// Matches the `GET` method token case-insensitively against the first bytes.
/// Deliberately a heuristic, not an HTTP parse; anything else is routed to
/// the frame decoder.
#[must_use]
pub fn is_upgrade_request(buf: &[u8]) -> bool {
    buf.len() >= 3 && buf[..3].eq_ignore_ascii_case(b"GET")
}

/// Whether the HTTP header block is complete (terminating blank line seen).
#[must_use]
pub fn headers_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n")
}

/// The part of a client upgrade request this server consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// The Sec-WebSocket-Key header value, trimmed.
    pub key: String,
}

impl UpgradeRequest {
    /// Extract the Sec-WebSocket-Key from raw upgrade request bytes.
    ///
    /// The header name is matched ASCII-case-insensitively and the value is
    /// trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidHandshake` if the data is not valid UTF-8
    /// - `Error::MissingHandshakeKey` if no Sec-WebSocket-Key header exists
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(data).map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        for line in text.lines().skip(1) {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("Sec-WebSocket-Key") {
                    return Ok(Self {
                        key: value.trim().to_string(),
                    });
                }
            }
        }

        Err(Error::MissingHandshakeKey)
    }
}

/// Server upgrade response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
}

impl UpgradeResponse {
    /// Build the response for a parsed upgrade request.
    #[must_use]
    pub fn from_request(req: &UpgradeRequest) -> Self {
        Self {
            accept: compute_accept_key(&req.key),
        }
    }

    /// Write the HTTP response bytes to a buffer.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    /// The response as a byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write(&mut buf);
        buf
    }
}
