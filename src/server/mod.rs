//! WebSocket server: registry, sessions, and the event surface.
//!
//! ## Session Lifecycle
//!
//! 1. **Connecting** - Socket accepted, opening handshake pending
//! 2. **Open** - Handshake response written; frames flow
//! 3. **Closing** - Close frame received or server-initiated close under way
//! 4. **Closed** - Socket released; the session leaves the live set
//!
//! One accept-loop task owns the listener; every accepted socket gets its own
//! worker task, so frames from a single session are handled strictly in
//! arrival order.

mod events;
mod registry;
mod session;

pub use events::ServerEvent;
pub use registry::WsServer;
pub use session::{SessionId, SessionState};
