//! Typed seam to the external peer-transport library.
//!
//! Discovery, signaling handshake, NAT traversal, and encrypted delivery all
//! live on the far side of this seam. The coordinator issues commands and
//! consumes events in transport delivery order. Ids for outbound channels
//! and calls are chosen by the caller and echoed back in events; inbound
//! ones arrive with a transport-assigned id.

use tokio::sync::mpsc;

use duolink_media::{MediaStream, MediaTrack};
use duolink_shared::{CallId, ChannelId, NetworkError, PeerId};

/// Commands sent *into* the transport task.
#[derive(Debug)]
pub enum TransportCommand {
    /// Open a data channel to a remote peer.
    ConnectChannel { channel: ChannelId, remote: PeerId },
    /// Deliver an opaque payload on an open channel (reliable, in order).
    SendChannelData { channel: ChannelId, data: Vec<u8> },
    /// Close a data channel.
    CloseChannel { channel: ChannelId },
    /// Place a media call, offering the local stream.
    PlaceCall {
        call: CallId,
        remote: PeerId,
        local_stream: MediaStream,
    },
    /// Answer a pending incoming call with the local stream.
    AnswerCall {
        call: CallId,
        local_stream: MediaStream,
    },
    /// Hang up or decline a call.
    CloseCall { call: CallId },
    /// Swap the call's outbound video sender track in place. The call, its
    /// audio path, and the connection are untouched.
    ReplaceOutboundVideoTrack { call: CallId, track: MediaTrack },
}

/// Events delivered *from* the transport task.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The transport came up and assigned our stable peer identifier.
    IdentifierAssigned { id: PeerId },
    /// The transport failed to come up.
    OpenFailed { reason: String },
    /// A remote peer opened a channel to us.
    IncomingChannel { channel: ChannelId, remote: PeerId },
    /// A channel (either direction) is now open for data.
    ChannelOpened { channel: ChannelId, remote: PeerId },
    /// Payload received on an open channel.
    ChannelData { channel: ChannelId, data: Vec<u8> },
    /// A channel closed.
    ChannelClosed { channel: ChannelId },
    /// A channel failed to open.
    ChannelFailed { channel: ChannelId, reason: String },
    /// A remote peer is calling us.
    IncomingCall { call: CallId, remote: PeerId },
    /// The remote side's stream arrived for a call.
    CallStream { call: CallId, stream: MediaStream },
    /// A call ended (remote hangup or decline).
    CallClosed { call: CallId },
    /// A call failed at the transport.
    CallFailed { call: CallId, reason: String },
}

/// Thin async wrapper over the transport command sender.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    cmd_tx: mpsc::Sender<TransportCommand>,
}

impl TransportHandle {
    pub fn new(cmd_tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn send(&self, cmd: TransportCommand) -> Result<(), NetworkError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| NetworkError::TransportUnavailable)
    }

    pub async fn connect_channel(
        &self,
        channel: ChannelId,
        remote: PeerId,
    ) -> Result<(), NetworkError> {
        self.send(TransportCommand::ConnectChannel { channel, remote })
            .await
    }

    pub async fn send_channel_data(
        &self,
        channel: ChannelId,
        data: Vec<u8>,
    ) -> Result<(), NetworkError> {
        self.send(TransportCommand::SendChannelData { channel, data })
            .await
    }

    pub async fn close_channel(&self, channel: ChannelId) -> Result<(), NetworkError> {
        self.send(TransportCommand::CloseChannel { channel }).await
    }

    pub async fn place_call(
        &self,
        call: CallId,
        remote: PeerId,
        local_stream: MediaStream,
    ) -> Result<(), NetworkError> {
        self.send(TransportCommand::PlaceCall {
            call,
            remote,
            local_stream,
        })
        .await
    }

    pub async fn answer_call(
        &self,
        call: CallId,
        local_stream: MediaStream,
    ) -> Result<(), NetworkError> {
        self.send(TransportCommand::AnswerCall { call, local_stream })
            .await
    }

    pub async fn close_call(&self, call: CallId) -> Result<(), NetworkError> {
        self.send(TransportCommand::CloseCall { call }).await
    }

    pub async fn replace_outbound_video_track(
        &self,
        call: CallId,
        track: MediaTrack,
    ) -> Result<(), NetworkError> {
        self.send(TransportCommand::ReplaceOutboundVideoTrack { call, track })
            .await
    }
}
