// Shared types for the Duolink session coordinator.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{ChannelError, DeviceError, DuolinkError, NetworkError, ProtocolViolation};
pub use protocol::ChatPayload;
pub use types::{CallId, CallKind, CallState, ChannelId, ChannelStatus, PeerId};
