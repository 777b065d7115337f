//! Shared wire protocol for `courier`: length-prefixed `bincode` frames over
//! TCP, used both by the scheduler facade's inbound listener and the
//! backend client's outbound calls.

pub mod error;
pub mod frame;
pub mod protocol;

pub use error::{Result, RpcError};
pub use frame::{MAX_FRAME_BYTES, read_frame, write_frame};
pub use protocol::{
    ApproveReply, BackendRequest, BackendResponse, DeliverReply, FacadeRequest, FacadeResponse,
    WireError,
};
