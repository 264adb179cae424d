//! WebSocket protocol core (RFC 6455): frame codec, masking, handshake.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
pub use handshake::{
    UpgradeRequest, UpgradeResponse, WS_GUID, compute_accept_key, headers_complete,
    is_upgrade_request,
};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
