//! Per-connection session: lifecycle state and the read/decode/dispatch loop.
//!
//! Each accepted socket is owned by exactly one session worker task. The
//! worker performs genuinely blocking reads (optionally bounded by a stream
//! timeout) and is cancelled through a per-session channel, independently of
//! the server-wide shutdown signal.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, trace, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode, UpgradeRequest, UpgradeResponse, headers_complete, is_upgrade_request};
use crate::server::events::ServerEvent;

/// Opaque identity of one accepted connection.
///
/// Identities are never reused within one server instance; equality is by
/// identity, not by address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Build a session id from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value of this id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum SessionState {
    /// Socket accepted, handshake not yet completed.
    #[default]
    Connecting,
    /// Handshake response written; frames flow.
    Open,
    /// Close observed or initiated, close echo pending or written.
    Closing,
    /// Socket released. Terminal.
    Closed,
}

impl SessionState {
    /// Check if the session is in an active (non-terminal) state.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }

    /// Check if sending data is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Closing => write!(f, "Closing"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Write half of a session's socket, shared between the worker (close echo,
/// pongs) and the registry (`send`/`broadcast`).
pub(crate) type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// The live-session set. The single mutual-exclusion discipline protecting
/// it: the accept loop inserts, session workers remove on close, the
/// registry snapshots for send/broadcast and drains on stop.
pub(crate) type SessionMap = Arc<StdMutex<HashMap<SessionId, SessionHandle>>>;

/// Registry-side handle to a live session.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    pub(crate) id: SessionId,
    pub(crate) peer: SocketAddr,
    pub(crate) writer: SharedWriter,
    cancel: Arc<watch::Sender<bool>>,
    closing: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Write one frame to this session's socket.
    pub(crate) async fn write_frame(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame.encode()).await?;
        Ok(())
    }

    /// Mark the close as server-initiated, so the worker does not echo the
    /// peer's close frame back (avoids a double-close write).
    pub(crate) fn mark_closing(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Stop this session's read loop.
    pub(crate) fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// How a session worker's read loop ended.
enum Exit {
    /// Peer closed the TCP stream cleanly (no close frame).
    Disconnected,
    /// Close frame handled, echo written if owed.
    PeerClose,
    /// Registry cancelled the session (server stop or forced teardown).
    Cancelled,
}

/// Split an accepted socket into a session worker plus its registry handle,
/// register it in the live set, and spawn the worker task.
pub(crate) fn spawn_session(
    id: SessionId,
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    timeout: Option<Duration>,
    events: mpsc::Sender<ServerEvent>,
    sessions: SessionMap,
) {
    let (reader, writer) = stream.into_split();
    let writer: SharedWriter = Arc::new(Mutex::new(writer));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let closing = Arc::new(AtomicBool::new(false));

    let handle = SessionHandle {
        id,
        peer,
        writer: Arc::clone(&writer),
        cancel: Arc::new(cancel_tx),
        closing: Arc::clone(&closing),
    };

    let read_buffer_size = config.read_buffer_size;
    let worker = SessionWorker {
        id,
        peer,
        reader,
        writer,
        buf: BytesMut::with_capacity(read_buffer_size),
        state: SessionState::Connecting,
        config,
        timeout,
        cancel: cancel_rx,
        closing,
        events,
        sessions: Arc::clone(&sessions),
    };

    // Register before spawning: the worker may exit immediately and must
    // find its own entry to remove.
    sessions
        .lock()
        .expect("session map poisoned")
        .insert(id, handle);

    tokio::spawn(worker.run());
}

/// Worker owning one session's read half.
struct SessionWorker {
    id: SessionId,
    peer: SocketAddr,
    reader: OwnedReadHalf,
    writer: SharedWriter,
    buf: BytesMut,
    state: SessionState,
    config: Arc<ServerConfig>,
    timeout: Option<Duration>,
    cancel: watch::Receiver<bool>,
    closing: Arc<AtomicBool>,
    events: mpsc::Sender<ServerEvent>,
    sessions: SessionMap,
}

impl SessionWorker {
    async fn run(mut self) {
        let outcome = self.drive().await;

        match outcome {
            Ok(Exit::Cancelled) => {
                // The registry initiated this teardown and owns its events.
                trace!(session = %self.id, "session cancelled");
            }
            Ok(Exit::PeerClose) | Ok(Exit::Disconnected) => {
                if self.remove_self() {
                    debug!(session = %self.id, peer = %self.peer, "session closed");
                    self.emit(ServerEvent::Closed {
                        session: Some(self.id),
                    })
                    .await;
                }
            }
            Err(error) => {
                // The session is torn down; the server process never is.
                if self.remove_self() {
                    warn!(session = %self.id, peer = %self.peer, %error, "session failed");
                    self.emit(ServerEvent::Error {
                        session: Some(self.id),
                        error,
                    })
                    .await;
                    self.emit(ServerEvent::Closed {
                        session: Some(self.id),
                    })
                    .await;
                }
            }
        }
    }

    /// The read/decode/dispatch loop.
    async fn drive(&mut self) -> Result<Exit> {
        let mut cancel = self.cancel.clone();

        loop {
            if let Some(exit) = self.process_buffer().await? {
                return Ok(exit);
            }

            let n = tokio::select! {
                changed = cancel.changed() => {
                    // A dropped sender also means the registry let go of us.
                    let _ = changed;
                    return Ok(Exit::Cancelled);
                }
                n = read_some(&mut self.reader, &mut self.buf, self.timeout) => n?,
            };

            if n == 0 {
                return self.on_eof();
            }
        }
    }

    /// Drain every complete handshake or frame currently buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    async fn process_buffer(&mut self) -> Result<Option<Exit>> {
        loop {
            if self.buf.is_empty() {
                return Ok(None);
            }

            // Handshake detection is a heuristic on the method token, not an
            // HTTP parse: pre-upgrade bytes that look like a GET request are
            // routed to the handshake handler, everything else to the frame
            // decoder. The method token is three bytes, so classification
            // waits until that many have arrived.
            if self.state == SessionState::Connecting && self.buf.len() < 3 {
                return Ok(None);
            }
            if self.state == SessionState::Connecting && is_upgrade_request(&self.buf) {
                self.config.limits.check_handshake_size(self.buf.len())?;
                if !headers_complete(&self.buf) {
                    return Ok(None);
                }
                self.perform_handshake().await?;
                continue;
            }

            // Reject an oversized frame from its header alone, before the
            // payload is buffered.
            if let Some((advertised, _)) = Frame::advertised_len(&self.buf) {
                self.config.limits.check_frame_size(advertised)?;
            }

            match Frame::decode(&self.buf) {
                Ok((frame, consumed)) => {
                    self.buf.advance(consumed);
                    if let Some(exit) = self.dispatch(frame).await? {
                        return Ok(Some(exit));
                    }
                }
                Err(Error::IncompleteFrame { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    /// Complete the opening handshake from the buffered request bytes.
    async fn perform_handshake(&mut self) -> Result<()> {
        let end = self
            .buf
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("caller checked headers_complete")
            + 4;
        let request_bytes = self.buf.split_to(end);

        let request = UpgradeRequest::parse(&request_bytes)?;
        let response = UpgradeResponse::from_request(&request);
        self.write_bytes(&response.to_bytes()).await?;

        self.state = SessionState::Open;
        debug!(session = %self.id, peer = %self.peer, "handshake complete");
        self.emit(ServerEvent::Opened {
            session: self.id,
            peer: self.peer,
        })
        .await;
        Ok(())
    }

    /// Handle one decoded frame.
    ///
    /// Every frame is treated as a complete message; the `fin` bit never
    /// drives reassembly, and continuation frames are dropped.
    async fn dispatch(&mut self, frame: Frame) -> Result<Option<Exit>> {
        frame.validate()?;

        match frame.opcode {
            OpCode::Text => {
                let text =
                    String::from_utf8(frame.into_payload()).map_err(|_| Error::InvalidUtf8)?;
                self.emit(ServerEvent::Data {
                    session: self.id,
                    message: Message::Text(text),
                })
                .await;
            }
            OpCode::Binary => {
                self.emit(ServerEvent::Data {
                    session: self.id,
                    message: Message::Binary(frame.into_payload()),
                })
                .await;
            }
            OpCode::Close => {
                self.state = SessionState::Closing;
                if !self.closing.load(Ordering::SeqCst) {
                    // Peer-initiated close: echo before releasing the socket.
                    // When the server initiated it, a close frame is already
                    // on the wire.
                    self.write_bytes(&Frame::close().encode()).await?;
                }
                self.state = SessionState::Closed;
                return Ok(Some(Exit::PeerClose));
            }
            OpCode::Ping => {
                if self.config.auto_pong {
                    self.write_bytes(&Frame::pong(frame.into_payload()).encode())
                        .await?;
                } else {
                    trace!(session = %self.id, "dropping ping (auto_pong disabled)");
                }
            }
            OpCode::Pong => {
                trace!(session = %self.id, "dropping unsolicited pong");
            }
            OpCode::Continuation => {
                debug!(
                    session = %self.id,
                    "dropping continuation frame: fragmented messages are not reassembled"
                );
            }
        }

        Ok(None)
    }

    /// Classify end-of-stream: clean when between frames, an error when the
    /// peer vanished mid-handshake or mid-frame.
    fn on_eof(&self) -> Result<Exit> {
        if self.buf.is_empty() {
            return Ok(Exit::Disconnected);
        }
        if self.state == SessionState::Connecting && is_upgrade_request(&self.buf) {
            return Err(Error::InvalidHandshake(
                "connection closed during handshake".into(),
            ));
        }
        match Frame::decode(&self.buf) {
            Err(e) => Err(e),
            // Unreachable in practice: complete frames are drained before
            // each read.
            Ok(_) => Ok(Exit::Disconnected),
        }
    }

    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        Ok(())
    }

    /// Remove this session from the live set. Returns whether the entry was
    /// still present; the remover owns the session's closed event.
    fn remove_self(&self) -> bool {
        self.sessions
            .lock()
            .expect("session map poisoned")
            .remove(&self.id)
            .is_some()
    }

    async fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event).await;
    }
}

/// One blocking read into the buffer, bounded by the stream timeout when one
/// is configured. Replaces the data-available polling some servers do: the
/// task suspends until bytes arrive, the peer hangs up, or the timeout
/// elapses.
async fn read_some(
    reader: &mut OwnedReadHalf,
    buf: &mut BytesMut,
    timeout: Option<Duration>,
) -> Result<usize> {
    let n = match timeout {
        Some(limit) => tokio::time::timeout(limit, reader.read_buf(buf))
            .await
            .map_err(|_| Error::Timeout)??,
        None => reader.read_buf(buf).await?,
    };
    Ok(n)
}
