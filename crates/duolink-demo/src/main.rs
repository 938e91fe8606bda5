//! # duolink-demo
//!
//! Drives two in-memory peers through a complete session: text chat with
//! typing signals, a video call, a mid-call screen share with the
//! platform-style "stop sharing" ending, and hangup. A smoke run of the
//! coordinator with no real transport or capture hardware involved.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duolink_media::{spawn_sim_devices, SimDeviceControl};
use duolink_net::MemoryNetwork;
use duolink_session::{spawn_session, SessionConfig, SessionHandle, SessionNotification};
use duolink_shared::{ChatPayload, PeerId};

struct Peer {
    handle: SessionHandle,
    devices: SimDeviceControl,
    id: PeerId,
}

fn spawn_peer(net: &MemoryNetwork, name: &'static str) -> Peer {
    let (transport, transport_rx, id) = net.endpoint();
    let (devices, device_rx, control) = spawn_sim_devices();
    let (handle, notif_rx) = spawn_session(
        transport,
        transport_rx,
        devices,
        device_rx,
        SessionConfig::default(),
    );
    tokio::spawn(print_notifications(name, notif_rx));
    Peer {
        handle,
        devices: control,
        id,
    }
}

async fn print_notifications(name: &'static str, mut rx: mpsc::Receiver<SessionNotification>) {
    while let Some(notification) = rx.recv().await {
        match notification {
            SessionNotification::IdentifierAssigned { id } => {
                info!(peer = name, id = %id.short(), "online");
            }
            SessionNotification::ChannelStatusChanged { status } => {
                info!(peer = name, ?status, "channel status");
            }
            SessionNotification::MessageReceived { payload, .. } => match payload {
                ChatPayload::Msg { content, is_image } if !is_image => {
                    info!(peer = name, content = %content, "message");
                }
                ChatPayload::Msg { content, .. } => {
                    info!(peer = name, bytes = content.len(), "image");
                }
                ChatPayload::Typing => {}
            },
            SessionNotification::TypingChanged { typing } => {
                info!(peer = name, typing, "typing indicator");
            }
            SessionNotification::CallStateChanged { state } => {
                info!(peer = name, ?state, "call state");
            }
            SessionNotification::RemoteStreamAttached { stream } => {
                info!(peer = name, tracks = stream.tracks().len(), "remote surface attached");
            }
            SessionNotification::LocalPreviewChanged { stream } => {
                info!(peer = name, attached = stream.is_some(), "local preview");
            }
            SessionNotification::ShareStateChanged { sharing } => {
                info!(peer = name, sharing, "screen share");
            }
            SessionNotification::MuteChanged { muted } => {
                info!(peer = name, muted, "microphone");
            }
            SessionNotification::Notice { text } => {
                info!(peer = name, notice = %text, "notice");
            }
        }
    }
}

async fn pause() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,duolink_session=debug")),
        )
        .init();

    info!("Starting Duolink demo v{}", env!("CARGO_PKG_VERSION"));

    let net = MemoryNetwork::new();
    let alice = spawn_peer(&net, "alice");
    let bob = spawn_peer(&net, "bob");
    pause().await;

    // 1. Text chat with a typing signal first.
    alice.handle.connect(bob.id.clone()).await?;
    pause().await;
    alice.handle.send_typing().await?;
    alice.handle.send_text("Hey Bob, got a minute?").await?;
    pause().await;
    bob.handle.send_text("Sure, call me.").await?;
    pause().await;

    // 2. Video call: Alice dials, Bob accepts.
    alice.handle.start_call(bob.id.clone(), true).await?;
    pause().await;
    bob.handle.accept_call().await?;
    pause().await;

    // 3. Mid-call screen share, ended through the platform control.
    alice.handle.start_share().await?;
    pause().await;
    if let Some(capture) = alice.devices.issued_streams().last() {
        if let Some(track) = capture.video_track() {
            alice.devices.end_track(track.id()).await;
        }
    }
    pause().await;

    // 4. Mute briefly, then hang up.
    alice.handle.set_muted(true).await?;
    pause().await;
    alice.handle.hangup().await?;
    pause().await;

    info!(
        alice_live = alice.devices.live_count(),
        bob_live = bob.devices.live_count(),
        "All streams released"
    );

    alice.handle.shutdown().await?;
    bob.handle.shutdown().await?;
    pause().await;

    info!("Demo complete");
    Ok(())
}
