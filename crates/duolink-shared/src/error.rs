use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuolinkError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

/// Identifier assignment or call setup failed at the transport.
/// Reported to the user; the session stays in (or returns to) a safe
/// idle-equivalent state and is never silently retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Failed to obtain a peer identifier: {0}")]
    IdentifierAssignment(String),

    #[error("Call setup failed: {0}")]
    CallSetup(String),

    #[error("Transport unavailable")]
    TransportUnavailable,
}

/// Capture hardware unavailable or permission denied. Aborts only the
/// in-progress operation; an already-active call or channel is untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Capture permission denied")]
    PermissionDenied,

    #[error("No capture device available")]
    NoDevice,

    #[error("Capture failed: {0}")]
    Capture(String),
}

/// The data channel failed to open. Surfaced to the user; no auto-reconnect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel failed to open: {0}")]
    OpenFailed(String),

    #[error("Channel open timed out")]
    Timeout,
}

/// Malformed payload on the data channel. Discarded and logged; the
/// connection remains open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Payload exceeds maximum size ({size} > {max} bytes)")]
    Oversized { size: usize, max: usize },
}
