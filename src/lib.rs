//! # wavesock - Event-driven WebSocket Server
//!
//! `wavesock` is an RFC 6455 compliant WebSocket server built directly on
//! TCP streams, with no HTTP framework underneath.
//!
//! ## Features
//!
//! - **Raw wire protocol**: opening handshake, frame demultiplexing, and
//!   client-to-server mask removal implemented from the RFC
//! - **Event surface**: connections, data, errors, and closes delivered over
//!   a single channel
//! - **Per-session workers**: one task per socket, blocking reads, FIFO
//!   dispatch per connection
//! - **Bounded resources**: frame and handshake size limits enforced before
//!   payloads are buffered
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wavesock::{ServerConfig, ServerEvent, WsServer};
//!
//! let (server, mut events) = WsServer::new(ServerConfig::default());
//! server.start("127.0.0.1:9001".parse()?, None).await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ServerEvent::Data { session, message } => {
//!             if let Some(text) = message.as_text() {
//!                 server.send(session, text).await;
//!             }
//!         }
//!         ServerEvent::Closed { session: None } => break,
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Limitations
//!
//! Fragmented messages are not reassembled: every frame is surfaced as a
//! complete message and continuation frames are dropped. Pings are answered
//! with Pongs unless `auto_pong` is disabled. TLS and permessage-deflate are
//! out of scope.

pub mod config;
pub mod error;
pub mod message;
pub mod protocol;
pub mod server;

pub use config::{Limits, ServerConfig};
pub use error::{Error, Result};
pub use message::Message;
pub use protocol::{Frame, OpCode, WS_GUID, compute_accept_key};
pub use server::{ServerEvent, SessionId, SessionState, WsServer};
