//! Events surfaced by the server to its caller.

use std::net::SocketAddr;

use crate::error::Error;
use crate::message::Message;
use crate::server::SessionId;

/// An event emitted by the server.
///
/// Events for one session are delivered in the order they occurred (one
/// worker owns each socket); there is no ordering guarantee across sessions.
/// A failure always produces exactly one [`ServerEvent::Error`] before the
/// associated [`ServerEvent::Closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServerEvent {
    /// A client completed the opening handshake.
    Opened {
        /// The session that opened.
        session: SessionId,
        /// Peer address of the accepted socket.
        peer: SocketAddr,
    },

    /// A data frame arrived on an open session.
    Data {
        /// The session the message arrived on.
        session: SessionId,
        /// The decoded message.
        message: Message,
    },

    /// A session or the server itself failed.
    Error {
        /// The affected session, or `None` for the server itself.
        session: Option<SessionId>,
        /// What went wrong.
        error: Error,
    },

    /// A session closed, or the server stopped.
    Closed {
        /// The closed session, or `None` when the server itself stopped.
        session: Option<SessionId>,
    },
}

impl ServerEvent {
    /// The session this event concerns, if any.
    #[must_use]
    pub const fn session(&self) -> Option<SessionId> {
        match self {
            ServerEvent::Opened { session, .. } | ServerEvent::Data { session, .. } => {
                Some(*session)
            }
            ServerEvent::Error { session, .. } | ServerEvent::Closed { session } => *session,
        }
    }
}
