//! The WebSocket server: listening socket, live-session set, and the
//! `start`/`stop`/`send`/`broadcast` operations.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::server::events::ServerEvent;
use crate::server::session::{self, SessionHandle, SessionId, SessionMap};

/// Accept-loop state for one `start`/`stop` cycle.
///
/// Rebuilt on every `start`, so a stopped server restarts with fresh
/// cancellation state.
struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// State shared between the server handle, the accept loop, and session
/// workers.
struct Shared {
    config: Arc<ServerConfig>,
    sessions: SessionMap,
    events: mpsc::Sender<ServerEvent>,
    next_id: AtomicU64,
    running: Mutex<Option<Running>>,
}

/// An event-driven WebSocket server.
///
/// The server owns a listening socket and the set of live sessions. One
/// accept-loop task hands each connection to its own session worker; workers
/// surface [`ServerEvent`]s on the channel returned by [`WsServer::new`].
///
/// ## Example
///
/// ```rust,ignore
/// use wavesock::{ServerConfig, ServerEvent, WsServer};
///
/// let (server, mut events) = WsServer::new(ServerConfig::default());
/// server.start("127.0.0.1:9001".parse()?, None).await?;
///
/// while let Some(event) = events.recv().await {
///     if let ServerEvent::Data { session, message } = event {
///         if let Some(text) = message.as_text() {
///             server.send(session, text).await;
///         }
///     }
/// }
/// ```
#[derive(Clone)]
pub struct WsServer {
    shared: Arc<Shared>,
}

impl WsServer {
    /// Create a server and the receiving end of its event channel.
    ///
    /// The channel outlives `start`/`stop` cycles; one receiver observes
    /// every run of this server instance.
    #[must_use]
    pub fn new(config: ServerConfig) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity);
        let server = Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                sessions: Arc::new(StdMutex::new(HashMap::new())),
                events: events_tx,
                next_id: AtomicU64::new(1),
                running: Mutex::new(None),
            }),
        };
        (server, events_rx)
    }

    /// Bind `addr` and begin accepting connections.
    ///
    /// `stream_timeout` bounds each session's blocking reads; `None` waits
    /// indefinitely. An accept-loop failure after startup surfaces as an
    /// [`ServerEvent::Error`] with no session and terminates the loop; the
    /// server must then be explicitly stopped and restarted.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyRunning` if called while the server is running
    /// - `Error::Startup` if binding the listener fails; the failure is also
    ///   surfaced as an error event and the server is not marked running
    pub async fn start(&self, addr: SocketAddr, stream_timeout: Option<Duration>) -> Result<()> {
        let mut running = self.shared.running.lock().await;
        if running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let startup = Error::Startup(e.to_string());
                error!(%addr, error = %startup, "failed to bind listener");
                let _ = self
                    .shared
                    .events
                    .send(ServerEvent::Error {
                        session: None,
                        error: startup.clone(),
                    })
                    .await;
                return Err(startup);
            }
        };

        let local_addr = listener.local_addr().map_err(|e| Error::Startup(e.to_string()))?;
        info!(%local_addr, "listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let accept_task =
            tokio::spawn(accept_loop(listener, shared, stream_timeout, shutdown_rx));

        *running = Some(Running {
            local_addr,
            shutdown: shutdown_tx,
            accept_task,
        });
        Ok(())
    }

    /// The address the listener is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Stop the server: force-close every live session, release the
    /// listening socket, and return to a startable state.
    ///
    /// No-op if the server is not running.
    pub async fn stop(&self) {
        let mut running = self.shared.running.lock().await;
        let Some(run) = running.take() else {
            return;
        };

        let _ = run.shutdown.send(true);
        let _ = run.accept_task.await;

        let handles: Vec<SessionHandle> = {
            let mut sessions = self.shared.sessions.lock().expect("session map poisoned");
            sessions.drain().map(|(_, handle)| handle).collect()
        };

        for handle in handles {
            handle.mark_closing();
            // Best effort: the peer may already be gone.
            if let Err(e) = handle.write_frame(&Frame::close()).await {
                debug!(session = %handle.id, error = %e, "close frame not delivered");
            }
            handle.cancel();
            let _ = self
                .shared
                .events
                .send(ServerEvent::Closed {
                    session: Some(handle.id),
                })
                .await;
        }

        info!("server stopped");
        let _ = self
            .shared
            .events
            .send(ServerEvent::Closed { session: None })
            .await;
    }

    /// Whether the server is currently running.
    pub async fn is_running(&self) -> bool {
        self.shared.running.lock().await.is_some()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.shared.sessions.lock().expect("session map poisoned").len()
    }

    /// Send `text` to exactly one session as a Text frame.
    ///
    /// A write failure is reported through the event channel (error, then
    /// closed) and tears the session down; it is never returned to the
    /// caller. Sending to an unknown or already-closed session is a no-op.
    pub async fn send(&self, session: SessionId, text: impl Into<String>) {
        let Some(handle) = self.lookup(session) else {
            return;
        };
        self.write_text(&handle, &Frame::text(text.into())).await;
    }

    /// Send `text` to every currently live session.
    ///
    /// Recipients are served concurrently, so one slow or failed send cannot
    /// block or abort delivery to the rest. There is no atomicity across
    /// recipients.
    pub async fn broadcast(&self, text: impl Into<String>) {
        let frame = Frame::text(text.into());
        let handles: Vec<SessionHandle> = {
            let sessions = self.shared.sessions.lock().expect("session map poisoned");
            sessions.values().cloned().collect()
        };

        for handle in handles {
            let server = self.clone();
            let frame = frame.clone();
            tokio::spawn(async move {
                server.write_text(&handle, &frame).await;
            });
        }
    }

    fn lookup(&self, session: SessionId) -> Option<SessionHandle> {
        self.shared
            .sessions
            .lock()
            .expect("session map poisoned")
            .get(&session)
            .cloned()
    }

    /// Write a frame to one session, tearing the session down on failure.
    async fn write_text(&self, handle: &SessionHandle, frame: &Frame) {
        if let Err(error) = handle.write_frame(frame).await {
            warn!(session = %handle.id, peer = %handle.peer, %error, "send failed");
            self.teardown(handle, error).await;
        }
    }

    /// Tear down one session after a failed write: remove it from the live
    /// set, surface the error, cancel the worker, and report the close.
    async fn teardown(&self, handle: &SessionHandle, error: Error) {
        let removed = self
            .shared
            .sessions
            .lock()
            .expect("session map poisoned")
            .remove(&handle.id)
            .is_some();
        if !removed {
            // Someone else (worker or stop) already owns the teardown.
            return;
        }

        let _ = self
            .shared
            .events
            .send(ServerEvent::Error {
                session: Some(handle.id),
                error,
            })
            .await;
        handle.cancel();
        let _ = self
            .shared
            .events
            .send(ServerEvent::Closed {
                session: Some(handle.id),
            })
            .await;
    }
}

/// The accept loop: one task, one listener, one worker spawned per accepted
/// socket.
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    stream_timeout: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                let _ = changed;
                debug!("accept loop shutting down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = SessionId::from_raw(shared.next_id.fetch_add(1, Ordering::Relaxed));
                    debug!(session = %id, %peer, "connection accepted");
                    session::spawn_session(
                        id,
                        stream,
                        peer,
                        Arc::clone(&shared.config),
                        stream_timeout,
                        shared.events.clone(),
                        Arc::clone(&shared.sessions),
                    );
                }
                Err(e) => {
                    // Listener failure kills the loop, not the process; the
                    // caller decides whether to restart.
                    let err = Error::from(e);
                    error!(error = %err, "accept failed, loop terminating");
                    let _ = shared
                        .events
                        .send(ServerEvent::Error {
                            session: None,
                            error: err,
                        })
                        .await;
                    return;
                }
            },
        }
    }
}
