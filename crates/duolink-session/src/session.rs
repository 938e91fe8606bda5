//! The session event loop.
//!
//! One spawned task owns all coordinator state and is fed exclusively
//! through channels: user commands, transport events, device events, and
//! completed media acquisitions. Each event runs to completion before the
//! next is processed. Media acquisition is the only suspension point; it is
//! performed in a helper task and completes back into the loop as a
//! `MediaReady` event carrying a token, so the handler can tell whether the
//! session has moved on (hangup, remote close) while the platform request
//! was in flight.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use duolink_media::{DeviceEvent, DevicesHandle, MediaConstraints, MediaStream};
use duolink_net::{TransportEvent, TransportHandle};
use duolink_shared::constants::{CHANNEL_BUFFER, TYPING_CLEAR_MS};
use duolink_shared::{
    CallId, CallKind, CallState, ChannelId, ChannelStatus, ChatPayload, DeviceError, PeerId,
};

use crate::call::{CallSession, RemoteAttach};
use crate::channel::ChannelManager;
use crate::events::SessionNotification;
use crate::share::ShareController;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet window after the last typing signal before the indicator clears.
    pub typing_clear: Duration,
    /// Capacity of the command and notification channels.
    pub buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_clear: Duration::from_millis(TYPING_CLEAR_MS),
            buffer: CHANNEL_BUFFER,
        }
    }
}

/// Commands sent *into* the session task.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Open a text channel to a remote peer.
    Connect { remote: PeerId },
    /// Send a text message on the current channel (no-op when closed).
    SendText { content: String },
    /// Send an image blob on the current channel (no-op when closed).
    SendImage { content: String },
    /// Signal that the local user is typing.
    SendTyping,
    /// Dial a call, with or without camera video.
    StartCall { remote: PeerId, video: bool },
    /// Accept the ringing incoming call.
    AcceptCall,
    /// Decline the ringing incoming call.
    RejectCall,
    /// End the current call.
    Hangup,
    /// Start screen sharing, or stop it when already sharing.
    StartShare,
    /// Stop screen sharing (no-op when not sharing).
    StopShare,
    /// Mute or unmute the microphone.
    SetMuted { muted: bool },
    /// Stop the session task.
    Shutdown,
}

/// The session task is no longer running.
#[derive(Debug, Error)]
#[error("Session task is no longer running")]
pub struct SessionClosed;

/// Handle for driving a session from the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionClosed> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionClosed)
    }

    pub async fn connect(&self, remote: PeerId) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Connect { remote }).await
    }

    pub async fn send_text(&self, content: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SendText {
            content: content.into(),
        })
        .await
    }

    pub async fn send_image(&self, content: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SendImage {
            content: content.into(),
        })
        .await
    }

    pub async fn send_typing(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SendTyping).await
    }

    pub async fn start_call(&self, remote: PeerId, video: bool) -> Result<(), SessionClosed> {
        self.send(SessionCommand::StartCall { remote, video }).await
    }

    pub async fn accept_call(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::AcceptCall).await
    }

    pub async fn reject_call(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::RejectCall).await
    }

    pub async fn hangup(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Hangup).await
    }

    pub async fn start_share(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::StartShare).await
    }

    pub async fn stop_share(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::StopShare).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SetMuted { muted }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// Why a media acquisition was started.
#[derive(Debug, Clone)]
enum MediaPurpose {
    Dial { remote: PeerId, kind: CallKind },
    Answer,
    Share,
}

/// Completion of a media acquisition, posted back into the loop.
#[derive(Debug)]
struct MediaReady {
    token: u64,
    purpose: MediaPurpose,
    result: Result<MediaStream, DeviceError>,
}

/// Spawn the session event loop.
///
/// Returns the command handle and the notification stream for the
/// presentation layer.
pub fn spawn_session(
    transport: TransportHandle,
    transport_rx: mpsc::Receiver<TransportEvent>,
    devices: DevicesHandle,
    device_rx: mpsc::Receiver<DeviceEvent>,
    config: SessionConfig,
) -> (SessionHandle, mpsc::Receiver<SessionNotification>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(config.buffer);
    let (notif_tx, notif_rx) = mpsc::channel::<SessionNotification>(config.buffer);
    let (media_tx, media_rx) = mpsc::channel::<MediaReady>(config.buffer);

    let session = Session {
        config,
        transport,
        devices,
        notif_tx,
        media_tx,
        channel: ChannelManager::new(),
        call: None,
        share: ShareController::new(),
        muted: false,
        typing_visible: false,
        typing_deadline: None,
        pending: None,
        next_token: 0,
    };

    tokio::spawn(session.run(cmd_rx, transport_rx, device_rx, media_rx));

    (SessionHandle { cmd_tx }, notif_rx)
}

struct Session {
    config: SessionConfig,
    transport: TransportHandle,
    devices: DevicesHandle,
    notif_tx: mpsc::Sender<SessionNotification>,
    media_tx: mpsc::Sender<MediaReady>,
    channel: ChannelManager,
    call: Option<CallSession>,
    share: ShareController,
    muted: bool,
    typing_visible: bool,
    typing_deadline: Option<Instant>,
    /// Token of the one in-flight media acquisition. Cleared on consumption
    /// and on teardown; a completion with a stale token releases its stream.
    pending: Option<u64>,
    next_token: u64,
}

impl Session {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SessionCommand>,
        mut transport_rx: mpsc::Receiver<TransportEvent>,
        mut device_rx: mpsc::Receiver<DeviceEvent>,
        mut media_rx: mpsc::Receiver<MediaReady>,
    ) {
        info!("Session loop started");

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(SessionCommand::Shutdown) => {
                        info!("Session shutdown requested");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },

                Some(event) = transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                Some(event) = device_rx.recv() => {
                    self.handle_device_event(event).await;
                }

                Some(ready) = media_rx.recv() => {
                    self.handle_media_ready(ready).await;
                }

                _ = typing_expiry(self.typing_deadline) => {
                    self.typing_deadline = None;
                    self.set_typing(false).await;
                }
            }
        }

        // Converge to idle before exiting so no stream outlives the session.
        if let Some(id) = self.call.as_ref().map(|c| c.id) {
            let _ = self.transport.close_call(id).await;
        }
        self.teardown_call(None).await;
        if let Some(id) = self.channel.current().map(|link| link.id) {
            let _ = self.transport.close_channel(id).await;
        }

        info!("Session loop terminated");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Connect { remote } => self.connect(remote).await,
            SessionCommand::SendText { content } => {
                self.send_payload(ChatPayload::text(content)).await;
            }
            SessionCommand::SendImage { content } => {
                self.send_payload(ChatPayload::image(content)).await;
            }
            SessionCommand::SendTyping => self.send_payload(ChatPayload::Typing).await,
            SessionCommand::StartCall { remote, video } => self.start_call(remote, video).await,
            SessionCommand::AcceptCall => self.accept_call().await,
            SessionCommand::RejectCall => self.reject_call().await,
            SessionCommand::Hangup => self.hangup().await,
            SessionCommand::StartShare => self.toggle_share().await,
            SessionCommand::StopShare => self.stop_share().await,
            SessionCommand::SetMuted { muted } => self.set_muted(muted).await,
            SessionCommand::Shutdown => {}
        }
    }

    async fn connect(&mut self, remote: PeerId) {
        let id = ChannelId::new();
        info!(remote = %remote.short(), "Connecting channel");
        if let Some(old) = self.channel.replace_with(id, remote.clone()) {
            debug!(channel = %old.id, "Replacing current channel");
            let _ = self.transport.close_channel(old.id).await;
        }
        if self.transport.connect_channel(id, remote).await.is_err() {
            self.notice("Network error: transport unavailable").await;
        }
    }

    async fn send_payload(&mut self, payload: ChatPayload) {
        // Sending with no open channel is a silent no-op.
        let Some(channel) = self.channel.open_link().map(|link| link.id) else {
            return;
        };
        match payload.to_bytes() {
            Ok(data) => {
                let _ = self.transport.send_channel_data(channel, data).await;
            }
            Err(e) => warn!(error = %e, "Failed to encode payload"),
        }
    }

    async fn start_call(&mut self, remote: PeerId, video: bool) {
        if self.call.is_some() {
            self.notice("Already in a call").await;
            return;
        }
        if self.pending.is_some() {
            debug!("Ignoring dial while an acquisition is pending");
            return;
        }
        let kind = if video {
            CallKind::AudioVideo
        } else {
            CallKind::Audio
        };
        info!(remote = %remote.short(), video, "Starting call");
        self.begin_acquisition(
            MediaPurpose::Dial { remote, kind },
            MediaConstraints::call(video),
        );
    }

    async fn accept_call(&mut self) {
        let ringing = self
            .call
            .as_ref()
            .is_some_and(|c| c.state == CallState::IncomingRinging);
        if !ringing {
            self.notice("No incoming call").await;
            return;
        }
        if self.pending.is_some() {
            // A stale dial acquisition may still be in flight; it will be
            // released on arrival.
            debug!("Superseding a pending acquisition");
        }
        info!("Accepting incoming call");
        self.begin_acquisition(MediaPurpose::Answer, MediaConstraints::call(true));
    }

    async fn reject_call(&mut self) {
        let Some(id) = self
            .call
            .as_ref()
            .filter(|c| c.state == CallState::IncomingRinging)
            .map(|c| c.id)
        else {
            self.notice("No incoming call").await;
            return;
        };
        info!(call = %id, "Rejecting incoming call");
        let _ = self.transport.close_call(id).await;
        // No media was ever requested for the rejected call.
        self.teardown_call(None).await;
    }

    async fn hangup(&mut self) {
        // Cancel any in-flight acquisition, including a pending dial.
        self.pending = None;
        let Some(id) = self.call.as_ref().map(|c| c.id) else {
            debug!("Hangup with no call");
            return;
        };
        info!(call = %id, "Hanging up");
        let _ = self.transport.close_call(id).await;
        self.teardown_call(Some("Call ended")).await;
    }

    async fn set_muted(&mut self, muted: bool) {
        let Some(track) = self
            .call
            .as_ref()
            .and_then(|c| c.local_stream.as_ref())
            .and_then(|s| s.audio_track())
            .cloned()
        else {
            return;
        };
        track.set_enabled(!muted);
        self.muted = muted;
        debug!(muted, "Mute state changed");
        self.notify(SessionNotification::MuteChanged { muted }).await;
    }

    // -----------------------------------------------------------------------
    // Media acquisition
    // -----------------------------------------------------------------------

    fn begin_acquisition(&mut self, purpose: MediaPurpose, constraints: MediaConstraints) {
        let token = self.next_token;
        self.next_token += 1;
        self.pending = Some(token);

        let devices = self.devices.clone();
        let media_tx = self.media_tx.clone();
        tokio::spawn(async move {
            let result = match purpose {
                MediaPurpose::Share => devices.request_display_capture(constraints).await,
                _ => devices.request_user_media(constraints).await,
            };
            let _ = media_tx
                .send(MediaReady {
                    token,
                    purpose,
                    result,
                })
                .await;
        });
    }

    async fn handle_media_ready(&mut self, ready: MediaReady) {
        if self.pending != Some(ready.token) {
            // The session moved on (hangup, remote close) while the platform
            // request was in flight.
            if let Ok(stream) = ready.result {
                debug!("Releasing media acquired for a cancelled operation");
                stream.stop_tracks();
            }
            return;
        }
        self.pending = None;

        match ready.purpose {
            MediaPurpose::Dial { remote, kind } => {
                self.finish_dial(remote, kind, ready.result).await;
            }
            MediaPurpose::Answer => self.finish_answer(ready.result).await,
            MediaPurpose::Share => self.finish_share(ready.result).await,
        }
    }

    async fn finish_dial(
        &mut self,
        remote: PeerId,
        kind: CallKind,
        result: Result<MediaStream, DeviceError>,
    ) {
        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                // The session stays idle; nothing was sent to the transport.
                warn!(error = %e, "Media acquisition failed, call not placed");
                self.notice(format!("Device error: {e}")).await;
                return;
            }
        };

        if self.call.is_some() {
            // An incoming call rang while we were waiting on the devices;
            // the ring wins.
            debug!("Discarding dial media, a call arrived first");
            stream.stop_tracks();
            return;
        }

        let id = CallId::new();
        self.call = Some(CallSession::outgoing(
            id,
            remote.clone(),
            kind,
            stream.clone(),
        ));
        self.notify(SessionNotification::LocalPreviewChanged {
            stream: Some(stream.clone()),
        })
        .await;

        if self.transport.place_call(id, remote, stream).await.is_err() {
            self.notice("Network error: transport unavailable").await;
            self.teardown_call(None).await;
            return;
        }
        self.notify(SessionNotification::CallStateChanged {
            state: CallState::Outgoing,
        })
        .await;
        info!(call = %id, "Call placed");
    }

    async fn finish_answer(&mut self, result: Result<MediaStream, DeviceError>) {
        let Some(call_id) = self
            .call
            .as_ref()
            .filter(|c| c.state == CallState::IncomingRinging)
            .map(|c| c.id)
        else {
            if let Ok(stream) = result {
                debug!("Releasing answer media, the call is gone");
                stream.stop_tracks();
            }
            return;
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(call = %call_id, error = %e, "Media acquisition failed, closing incoming call");
                self.notice(format!("Device error: {e}")).await;
                let _ = self.transport.close_call(call_id).await;
                self.teardown_call(None).await;
                return;
            }
        };

        if let Some(call) = self.call.as_mut() {
            call.answered(stream.clone());
        }
        self.notify(SessionNotification::LocalPreviewChanged {
            stream: Some(stream.clone()),
        })
        .await;

        if self.transport.answer_call(call_id, stream).await.is_err() {
            self.notice("Network error: transport unavailable").await;
            self.teardown_call(None).await;
            return;
        }
        self.notify(SessionNotification::CallStateChanged {
            state: CallState::Active,
        })
        .await;
        info!(call = %call_id, "Call answered");
    }

    // -----------------------------------------------------------------------
    // Screen sharing
    // -----------------------------------------------------------------------

    async fn toggle_share(&mut self) {
        if self.share.is_active() {
            self.stop_share().await;
            return;
        }
        let active = self.call.as_ref().is_some_and(|c| c.is_active());
        if !active {
            self.notice("No active call to share into").await;
            return;
        }
        if self.pending.is_some() {
            debug!("Ignoring share toggle while an acquisition is pending");
            return;
        }
        self.begin_acquisition(MediaPurpose::Share, MediaConstraints::screen_capture());
    }

    async fn finish_share(&mut self, result: Result<MediaStream, DeviceError>) {
        let capture = match result {
            Ok(capture) => capture,
            Err(e) => {
                // Denial or cancel leaves the call completely unaffected.
                info!(error = %e, "Screen capture request declined");
                self.notice("Screen sharing was cancelled").await;
                return;
            }
        };

        let Some(call_id) = self.call.as_ref().filter(|c| c.is_active()).map(|c| c.id) else {
            debug!("Call ended while capture was pending, releasing");
            capture.stop_tracks();
            return;
        };

        let Some(track) = capture.video_track().cloned() else {
            warn!("Display capture yielded no video track");
            capture.stop_tracks();
            self.notice("Screen sharing was cancelled").await;
            return;
        };

        self.share.begin(capture.clone());
        let _ = self
            .transport
            .replace_outbound_video_track(call_id, track)
            .await;

        // Self-preview while sharing: the remote surface shows the capture
        // stream so the user can confirm what is being shared.
        self.notify(SessionNotification::RemoteStreamAttached { stream: capture })
            .await;
        self.notify(SessionNotification::ShareStateChanged { sharing: true })
            .await;
        info!(call = %call_id, "Screen sharing started");
    }

    /// Idempotent: a no-op when no share is active.
    async fn stop_share(&mut self) {
        let Some(capture) = self.share.take() else {
            return;
        };
        capture.stop_tracks();

        if let Some(call) = &self.call {
            let call_id = call.id;
            let camera = call
                .local_stream
                .as_ref()
                .and_then(|s| s.video_track())
                .cloned();
            let remote = call.remote_stream.clone();

            // An audio-only call has no camera track to restore.
            if let Some(camera) = camera {
                let _ = self
                    .transport
                    .replace_outbound_video_track(call_id, camera)
                    .await;
            }
            // Put the actual remote stream back on the remote surface.
            if let Some(remote) = remote {
                self.notify(SessionNotification::RemoteStreamAttached { stream: remote })
                    .await;
            }
        }

        self.notify(SessionNotification::ShareStateChanged { sharing: false })
            .await;
        info!("Screen sharing stopped");
    }

    // -----------------------------------------------------------------------
    // Transport events
    // -----------------------------------------------------------------------

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::IdentifierAssigned { id } => {
                info!(id = %id.short(), "Peer identifier assigned");
                self.notify(SessionNotification::IdentifierAssigned { id })
                    .await;
            }

            TransportEvent::OpenFailed { reason } => {
                warn!(reason = %reason, "Transport failed to open");
                self.notice(format!("Network error: {reason}")).await;
            }

            TransportEvent::IncomingChannel { channel, remote } => {
                info!(channel = %channel, remote = %remote.short(), "Incoming channel");
                if let Some(old) = self.channel.replace_with(channel, remote) {
                    debug!(channel = %old.id, "Replacing current channel");
                    let _ = self.transport.close_channel(old.id).await;
                }
            }

            TransportEvent::ChannelOpened { channel, remote } => {
                if self.channel.mark_open(channel) {
                    info!(remote = %remote.short(), "Channel open");
                    self.notify(SessionNotification::ChannelStatusChanged {
                        status: ChannelStatus::Connected { remote },
                    })
                    .await;
                } else {
                    debug!(channel = %channel, "Open event for a stale channel");
                }
            }

            TransportEvent::ChannelData { channel, data } => {
                self.handle_channel_data(channel, data).await;
            }

            TransportEvent::ChannelClosed { channel } => {
                if self.channel.mark_closed(channel) {
                    info!("Channel closed");
                    self.notify(SessionNotification::ChannelStatusChanged {
                        status: ChannelStatus::Disconnected,
                    })
                    .await;
                    self.notice("Peer disconnected").await;
                } else {
                    debug!(channel = %channel, "Close event for a stale channel");
                }
            }

            TransportEvent::ChannelFailed { channel, reason } => {
                if self.channel.mark_failed(channel) {
                    warn!(reason = %reason, "Channel failed to open");
                    self.notice(format!("Connection failed: {reason}")).await;
                } else {
                    debug!(channel = %channel, "Failure event for a stale channel");
                }
            }

            TransportEvent::IncomingCall { call, remote } => {
                self.handle_incoming_call(call, remote).await;
            }

            TransportEvent::CallStream { call, stream } => {
                self.handle_call_stream(call, stream).await;
            }

            TransportEvent::CallClosed { call } => {
                if self.call.as_ref().is_some_and(|c| c.id == call) {
                    self.teardown_call(Some("Call closed")).await;
                } else {
                    debug!(call = %call, "Close event for a stale call");
                }
            }

            TransportEvent::CallFailed { call, reason } => {
                if self.call.as_ref().is_some_and(|c| c.id == call) {
                    warn!(call = %call, reason = %reason, "Call failed");
                    let text = format!("Call failed: {reason}");
                    self.teardown_call(Some(text.as_str())).await;
                } else {
                    debug!(call = %call, "Failure event for a stale call");
                }
            }
        }
    }

    async fn handle_channel_data(&mut self, channel: ChannelId, data: Vec<u8>) {
        if !self.channel.is_current(channel) {
            debug!(channel = %channel, "Data on a stale channel dropped");
            return;
        }
        match ChatPayload::from_bytes(&data) {
            Ok(ChatPayload::Typing) => {
                // Debounce: each signal restarts the single pending clear
                // timer instead of queueing another one.
                self.typing_deadline = Some(Instant::now() + self.config.typing_clear);
                self.set_typing(true).await;
            }
            Ok(payload) => {
                // A delivered message ends the typing indication.
                self.typing_deadline = None;
                self.set_typing(false).await;
                self.notify(SessionNotification::MessageReceived {
                    payload,
                    received_at: Utc::now(),
                })
                .await;
            }
            Err(violation) => {
                // Malformed payloads are dropped; the channel stays open.
                warn!(error = %violation, "Discarding malformed payload");
            }
        }
    }

    async fn handle_incoming_call(&mut self, call: CallId, remote: PeerId) {
        if self.call.is_some() {
            // Single-call model: a second call cannot ring.
            info!(call = %call, remote = %remote.short(), "Declining call while busy");
            let _ = self.transport.close_call(call).await;
            return;
        }
        info!(call = %call, remote = %remote.short(), "Incoming call ringing");
        self.call = Some(CallSession::incoming(call, remote));
        self.notify(SessionNotification::CallStateChanged {
            state: CallState::IncomingRinging,
        })
        .await;
    }

    async fn handle_call_stream(&mut self, call: CallId, stream: MediaStream) {
        let attach = match self.call.as_mut() {
            Some(c) if c.id == call => c.attach_remote(stream.clone()),
            _ => {
                debug!(call = %call, "Stream for a stale call dropped");
                return;
            }
        };

        match attach {
            RemoteAttach::NowActive => {
                info!(call = %call, "Remote stream attached, call active");
                self.notify(SessionNotification::RemoteStreamAttached { stream })
                    .await;
                self.notify(SessionNotification::CallStateChanged {
                    state: CallState::Active,
                })
                .await;
            }
            RemoteAttach::AlreadyActive => {
                // While sharing, the remote surface keeps showing the capture;
                // the tracked stream is restored when the share stops.
                if !self.share.is_active() {
                    self.notify(SessionNotification::RemoteStreamAttached { stream })
                        .await;
                }
            }
            RemoteAttach::Ignored => {
                debug!(call = %call, "Duplicate remote stream ignored");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Device events
    // -----------------------------------------------------------------------

    async fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::TrackEnded { track } => {
                if self.share.owns_track(track) {
                    info!("Capture track ended by the platform, stopping share");
                    self.stop_share().await;
                } else {
                    debug!(track = %track, "Ended track is not the capture track");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Teardown and notification plumbing
    // -----------------------------------------------------------------------

    /// The single teardown path. Every exit edge (hangup, reject, remote
    /// close, transport error, shutdown) funnels here, so the call's streams
    /// are released exactly once no matter which trigger fired first.
    async fn teardown_call(&mut self, notice: Option<&str>) {
        self.pending = None;
        let Some(call) = self.call.take() else {
            return;
        };

        if let Some(capture) = self.share.take() {
            capture.stop_tracks();
            self.notify(SessionNotification::ShareStateChanged { sharing: false })
                .await;
        }

        let had_local = call.local_stream.is_some();
        if let Some(local) = call.local_stream {
            local.stop_tracks();
        }

        if self.muted {
            self.muted = false;
            self.notify(SessionNotification::MuteChanged { muted: false })
                .await;
        }
        if had_local {
            self.notify(SessionNotification::LocalPreviewChanged { stream: None })
                .await;
        }
        self.notify(SessionNotification::CallStateChanged {
            state: CallState::Idle,
        })
        .await;
        if let Some(text) = notice {
            self.notice(text).await;
        }
        info!(call = %call.id, "Call torn down");
    }

    async fn set_typing(&mut self, typing: bool) {
        if self.typing_visible != typing {
            self.typing_visible = typing;
            self.notify(SessionNotification::TypingChanged { typing })
                .await;
        }
    }

    async fn notice(&mut self, text: impl Into<String>) {
        self.notify(SessionNotification::Notice { text: text.into() })
            .await;
    }

    async fn notify(&mut self, notification: SessionNotification) {
        if self.notif_tx.send(notification).await.is_err() {
            debug!("Notification dropped, presentation side is gone");
        }
    }
}

async fn typing_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
