use chrono::{DateTime, Utc};

use duolink_media::MediaStream;
use duolink_shared::{CallState, ChannelStatus, ChatPayload, PeerId};

/// Notifications delivered from the session loop to the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    /// The transport assigned our stable peer identifier.
    IdentifierAssigned { id: PeerId },

    /// The text channel opened or closed.
    ChannelStatusChanged { status: ChannelStatus },

    /// A chat message (text or image) arrived on the channel.
    MessageReceived {
        payload: ChatPayload,
        received_at: DateTime<Utc>,
    },

    /// The transient "peer is typing" indicator changed.
    TypingChanged { typing: bool },

    /// The call moved to a new lifecycle state.
    CallStateChanged { state: CallState },

    /// A stream should be rendered on the remote surface. During screen
    /// sharing this carries the capture stream (self-preview mode).
    RemoteStreamAttached { stream: MediaStream },

    /// The local self-view surface changed; `None` clears it.
    LocalPreviewChanged { stream: Option<MediaStream> },

    /// Screen sharing started or stopped.
    ShareStateChanged { sharing: bool },

    /// Microphone mute changed.
    MuteChanged { muted: bool },

    /// A dismissible user-facing notice.
    Notice { text: String },
}
