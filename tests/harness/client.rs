//! Minimal WebSocket test client speaking raw TCP.
//!
//! Implements just enough of the client side of RFC 6455 to drive the
//! server: the upgrade request, masked frame encoding, and unmasked frame
//! decoding.

use std::io;
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use wavesock::compute_accept_key;

const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

/// A raw-TCP WebSocket client for tests.
pub struct TestClient {
    stream: TcpStream,
    buf: BytesMut,
}

#[allow(dead_code)] // not every test binary uses every helper
impl TestClient {
    /// Connect and complete the opening handshake, verifying the accept key.
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;

        let request = format!(
            "GET /chat HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {SAMPLE_KEY}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await?;

        let mut client = Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        };
        let response = client.read_http_response().await?;

        assert!(
            response.starts_with("HTTP/1.1 101 Switching Protocols"),
            "unexpected handshake response: {response}"
        );
        let expected = format!("Sec-WebSocket-Accept: {}", compute_accept_key(SAMPLE_KEY));
        assert!(
            response.contains(&expected),
            "accept key missing from response: {response}"
        );

        Ok(client)
    }

    /// Connect without performing the handshake.
    pub async fn connect_raw(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        })
    }

    async fn read_http_response(&mut self) -> io::Result<String> {
        loop {
            if let Some(end) = self.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let header = self.buf.split_to(end + 4);
                return Ok(String::from_utf8_lossy(&header).into_owned());
            }
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "eof during handshake",
                ));
            }
        }
    }

    fn random_mask() -> [u8; 4] {
        let mut mask = [0u8; 4];
        getrandom::getrandom(&mut mask).expect("getrandom failed");
        mask
    }

    /// Encode one client frame: fin=1, masked, given opcode and payload.
    fn encode_masked(opcode: u8, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::with_capacity(14 + payload.len());
        out.push(0x80 | opcode);

        let len = payload.len();
        if len <= 125 {
            out.push(0x80 | len as u8);
        } else if len <= 65535 {
            out.push(0x80 | 126);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            out.push(0x80 | 127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }

        out.extend_from_slice(&mask);
        out.extend(
            payload
                .iter()
                .enumerate()
                .map(|(i, b)| b ^ mask[i % 4]),
        );
        out
    }

    /// Send a masked frame with the given opcode.
    pub async fn send_frame(&mut self, opcode: u8, payload: &[u8]) -> io::Result<()> {
        let wire = Self::encode_masked(opcode, payload, Self::random_mask());
        self.stream.write_all(&wire).await
    }

    /// Send a masked text frame.
    pub async fn send_text(&mut self, text: &str) -> io::Result<()> {
        self.send_frame(0x1, text.as_bytes()).await
    }

    /// Send a masked close frame with an empty payload.
    pub async fn send_close(&mut self) -> io::Result<()> {
        self.send_frame(0x8, &[]).await
    }

    /// Send arbitrary bytes, bypassing frame encoding.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await
    }

    /// Receive one unmasked server frame. Returns `(opcode, payload)`, or
    /// `None` on a clean end of stream between frames.
    pub async fn recv_frame(&mut self) -> io::Result<Option<(u8, Vec<u8>)>> {
        loop {
            if let Some(frame) = self.try_parse_frame() {
                return Ok(Some(frame));
            }
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "eof mid-frame",
                ));
            }
        }
    }

    fn try_parse_frame(&mut self) -> Option<(u8, Vec<u8>)> {
        if self.buf.len() < 2 {
            return None;
        }
        let opcode = self.buf[0] & 0x0F;
        assert_eq!(
            self.buf[1] & 0x80,
            0,
            "server frames must not be masked"
        );

        let (len, header) = match self.buf[1] & 0x7F {
            126 => {
                if self.buf.len() < 4 {
                    return None;
                }
                (u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize, 4)
            }
            127 => {
                if self.buf.len() < 10 {
                    return None;
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.buf[2..10]);
                (u64::from_be_bytes(raw) as usize, 10)
            }
            base => (base as usize, 2),
        };

        if self.buf.len() < header + len {
            return None;
        }
        self.buf.advance(header);
        let payload = self.buf.split_to(len).to_vec();
        Some((opcode, payload))
    }

    /// Receive one text frame and return its payload as a string.
    pub async fn recv_text(&mut self) -> io::Result<Option<String>> {
        match self.recv_frame().await? {
            Some((0x1, payload)) => Ok(Some(String::from_utf8(payload).expect("bad utf8"))),
            Some((opcode, _)) => panic!("expected text frame, got opcode {opcode:#x}"),
            None => Ok(None),
        }
    }

    /// Read until the server closes the stream; asserts no unread data
    /// remains afterwards beyond complete frames already buffered.
    pub async fn wait_for_eof(&mut self) -> io::Result<()> {
        loop {
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Ok(());
            }
        }
    }
}
