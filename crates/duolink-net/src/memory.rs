//! In-process transport that pairs endpoints through a shared hub.
//!
//! Stands where the external peer-transport library stands in production:
//! assigns identifiers asynchronously, pairs channels and calls between two
//! endpoints, delivers channel payloads in order, and keeps one outbound
//! video sender slot per call side whose track can be replaced in place.
//! Used by the integration tests and the demo binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use duolink_media::{MediaStream, MediaTrack};
use duolink_shared::constants::CHANNEL_BUFFER;
use duolink_shared::{CallId, ChannelId, PeerId};

use crate::adapter::{TransportCommand, TransportEvent, TransportHandle};

#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    hub: Arc<Mutex<Hub>>,
}

#[derive(Debug, Default)]
struct Hub {
    endpoints: HashMap<PeerId, mpsc::Sender<TransportEvent>>,
    channels: HashMap<ChannelId, ChannelLink>,
    calls: HashMap<CallId, CallLink>,
}

#[derive(Debug)]
struct ChannelLink {
    a: PeerId,
    b: PeerId,
}

impl ChannelLink {
    fn other(&self, local: &PeerId) -> &PeerId {
        if &self.a == local {
            &self.b
        } else {
            &self.a
        }
    }
}

#[derive(Debug)]
struct CallLink {
    caller: PeerId,
    callee: PeerId,
    // Held until the callee answers, then delivered as its stream event.
    caller_stream: MediaStream,
    // Outbound video sender slot per side; None when that side's stream
    // carried no video track.
    caller_video: Option<MediaTrack>,
    callee_video: Option<MediaTrack>,
}

type Delivery = (mpsc::Sender<TransportEvent>, TransportEvent);

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint and spawn its command loop.
    ///
    /// Returns `(handle, event_rx, peer_id)`. The identifier is also
    /// delivered asynchronously as the first event, like the live
    /// transport's open notification.
    pub fn endpoint(&self) -> (TransportHandle, mpsc::Receiver<TransportEvent>, PeerId) {
        let id = PeerId::new(format!("mem-{}", Uuid::new_v4().simple()));
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(CHANNEL_BUFFER);
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<TransportCommand>(CHANNEL_BUFFER);

        self.lock().endpoints.insert(id.clone(), event_tx.clone());
        debug!(peer = %id.short(), "Memory endpoint registered");

        let hub = self.hub.clone();
        let local = id.clone();
        tokio::spawn(async move {
            let _ = event_tx
                .send(TransportEvent::IdentifierAssigned { id: local.clone() })
                .await;

            while let Some(cmd) = cmd_rx.recv().await {
                let deliveries = {
                    let mut guard = lock_hub(&hub);
                    handle_command(&mut guard, &local, cmd)
                };
                for (tx, event) in deliveries {
                    let _ = tx.send(event).await;
                }
            }

            lock_hub(&hub).endpoints.remove(&local);
            debug!(peer = %local.short(), "Memory endpoint deregistered");
        });

        (TransportHandle::new(cmd_tx), event_rx, id)
    }

    /// Ids of the calls currently paired by the hub.
    pub fn calls(&self) -> Vec<CallId> {
        self.lock().calls.keys().copied().collect()
    }

    /// Current outbound video sender track for one side of a call.
    /// `None` when the call is gone or that side has no video sender.
    pub fn outbound_video_track(&self, call: CallId, side: &PeerId) -> Option<MediaTrack> {
        let hub = self.lock();
        let link = hub.calls.get(&call)?;
        if &link.caller == side {
            link.caller_video.clone()
        } else if &link.callee == side {
            link.callee_video.clone()
        } else {
            None
        }
    }

    fn lock(&self) -> MutexGuard<'_, Hub> {
        lock_hub(&self.hub)
    }
}

fn lock_hub(hub: &Arc<Mutex<Hub>>) -> MutexGuard<'_, Hub> {
    hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn handle_command(hub: &mut Hub, local: &PeerId, cmd: TransportCommand) -> Vec<Delivery> {
    match cmd {
        TransportCommand::ConnectChannel { channel, remote } => {
            let Some(remote_tx) = hub.endpoints.get(&remote).cloned() else {
                warn!(remote = %remote.short(), "Connect to unknown peer");
                return deliver_to(hub, local, TransportEvent::ChannelFailed {
                    channel,
                    reason: format!("unknown peer {remote}"),
                });
            };
            hub.channels.insert(
                channel,
                ChannelLink {
                    a: local.clone(),
                    b: remote.clone(),
                },
            );
            debug!(channel = %channel, from = %local.short(), to = %remote.short(), "Channel paired");

            let mut out = vec![
                (
                    remote_tx.clone(),
                    TransportEvent::IncomingChannel {
                        channel,
                        remote: local.clone(),
                    },
                ),
                (
                    remote_tx,
                    TransportEvent::ChannelOpened {
                        channel,
                        remote: local.clone(),
                    },
                ),
            ];
            out.extend(deliver_to(hub, local, TransportEvent::ChannelOpened { channel, remote }));
            out
        }

        TransportCommand::SendChannelData { channel, data } => {
            let Some(link) = hub.channels.get(&channel) else {
                debug!(channel = %channel, "Data on unknown channel dropped");
                return Vec::new();
            };
            let other = link.other(local).clone();
            deliver_to(hub, &other, TransportEvent::ChannelData { channel, data })
        }

        TransportCommand::CloseChannel { channel } => match hub.channels.remove(&channel) {
            Some(link) => {
                let mut out = deliver_to(hub, &link.a, TransportEvent::ChannelClosed { channel });
                out.extend(deliver_to(hub, &link.b, TransportEvent::ChannelClosed { channel }));
                out
            }
            None => Vec::new(),
        },

        TransportCommand::PlaceCall {
            call,
            remote,
            local_stream,
        } => {
            if !hub.endpoints.contains_key(&remote) {
                warn!(remote = %remote.short(), "Call to unknown peer");
                return deliver_to(hub, local, TransportEvent::CallFailed {
                    call,
                    reason: format!("unknown peer {remote}"),
                });
            }
            let caller_video = local_stream.video_track().cloned();
            hub.calls.insert(
                call,
                CallLink {
                    caller: local.clone(),
                    callee: remote.clone(),
                    caller_stream: local_stream,
                    caller_video,
                    callee_video: None,
                },
            );
            debug!(call = %call, from = %local.short(), to = %remote.short(), "Call placed");
            deliver_to(hub, &remote, TransportEvent::IncomingCall {
                call,
                remote: local.clone(),
            })
        }

        TransportCommand::AnswerCall { call, local_stream } => {
            let Some(link) = hub.calls.get_mut(&call) else {
                debug!(call = %call, "Answer for unknown call dropped");
                return Vec::new();
            };
            if &link.callee != local {
                warn!(call = %call, "Answer from a peer that is not the callee");
                return Vec::new();
            }
            link.callee_video = local_stream.video_track().cloned();
            let caller = link.caller.clone();
            let caller_stream = link.caller_stream.clone();

            let mut out = deliver_to(hub, &caller, TransportEvent::CallStream {
                call,
                stream: local_stream,
            });
            out.extend(deliver_to(hub, local, TransportEvent::CallStream {
                call,
                stream: caller_stream,
            }));
            out
        }

        TransportCommand::CloseCall { call } => match hub.calls.remove(&call) {
            Some(link) => {
                debug!(call = %call, "Call closed");
                let mut out = deliver_to(hub, &link.caller, TransportEvent::CallClosed { call });
                out.extend(deliver_to(hub, &link.callee, TransportEvent::CallClosed { call }));
                out
            }
            None => Vec::new(),
        },

        TransportCommand::ReplaceOutboundVideoTrack { call, track } => {
            let Some(link) = hub.calls.get_mut(&call) else {
                debug!(call = %call, "Replace track on unknown call dropped");
                return Vec::new();
            };
            let slot = if &link.caller == local {
                &mut link.caller_video
            } else {
                &mut link.callee_video
            };
            if slot.is_some() {
                debug!(call = %call, new = %track.id(), "Outbound video track replaced");
                *slot = Some(track);
            } else {
                // An audio-only side has no video sender to swap.
                warn!(call = %call, "No outbound video sender on this call");
            }
            Vec::new()
        }
    }
}

fn deliver_to(hub: &Hub, peer: &PeerId, event: TransportEvent) -> Vec<Delivery> {
    match hub.endpoints.get(peer) {
        Some(tx) => vec![(tx.clone(), event)],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolink_media::{MediaTrack, TrackKind, TrackSource};

    fn camera_stream() -> MediaStream {
        MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, TrackSource::Microphone),
            MediaTrack::new(TrackKind::Video, TrackSource::Camera),
        ])
    }

    async fn expect_identifier(rx: &mut mpsc::Receiver<TransportEvent>, id: &PeerId) {
        match rx.recv().await.unwrap() {
            TransportEvent::IdentifierAssigned { id: assigned } => assert_eq!(&assigned, id),
            other => panic!("Expected IdentifierAssigned, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identifier_assignment() {
        let net = MemoryNetwork::new();
        let (_handle, mut rx, id) = net.endpoint();
        expect_identifier(&mut rx, &id).await;
    }

    #[tokio::test]
    async fn test_channel_pairing_and_ordered_data() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        let (_b, mut b_rx, b_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;
        expect_identifier(&mut b_rx, &b_id).await;

        let channel = ChannelId::new();
        a.connect_channel(channel, b_id.clone()).await.unwrap();

        match b_rx.recv().await.unwrap() {
            TransportEvent::IncomingChannel { channel: ch, remote } => {
                assert_eq!(ch, channel);
                assert_eq!(remote, a_id);
            }
            other => panic!("Expected IncomingChannel, got {other:?}"),
        }
        assert!(matches!(
            b_rx.recv().await.unwrap(),
            TransportEvent::ChannelOpened { .. }
        ));
        match a_rx.recv().await.unwrap() {
            TransportEvent::ChannelOpened { remote, .. } => assert_eq!(remote, b_id),
            other => panic!("Expected ChannelOpened, got {other:?}"),
        }

        for n in 0u8..3 {
            a.send_channel_data(channel, vec![n]).await.unwrap();
        }
        for n in 0u8..3 {
            match b_rx.recv().await.unwrap() {
                TransportEvent::ChannelData { data, .. } => assert_eq!(data, vec![n]),
                other => panic!("Expected ChannelData, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_channel_close_notifies_both_sides() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        let (_b, mut b_rx, b_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;
        expect_identifier(&mut b_rx, &b_id).await;

        let channel = ChannelId::new();
        a.connect_channel(channel, b_id).await.unwrap();
        let _ = a_rx.recv().await; // opened
        let _ = b_rx.recv().await; // incoming
        let _ = b_rx.recv().await; // opened

        a.close_channel(channel).await.unwrap();
        assert!(matches!(
            a_rx.recv().await.unwrap(),
            TransportEvent::ChannelClosed { .. }
        ));
        assert!(matches!(
            b_rx.recv().await.unwrap(),
            TransportEvent::ChannelClosed { .. }
        ));
    }

    #[tokio::test]
    async fn test_connect_unknown_peer_fails() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;

        let channel = ChannelId::new();
        a.connect_channel(channel, PeerId::new("nobody")).await.unwrap();
        match a_rx.recv().await.unwrap() {
            TransportEvent::ChannelFailed { channel: ch, .. } => assert_eq!(ch, channel),
            other => panic!("Expected ChannelFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_call_answer_delivers_both_streams() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        let (b, mut b_rx, b_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;
        expect_identifier(&mut b_rx, &b_id).await;

        let call = CallId::new();
        let a_stream = camera_stream();
        let b_stream = camera_stream();

        a.place_call(call, b_id.clone(), a_stream.clone()).await.unwrap();
        match b_rx.recv().await.unwrap() {
            TransportEvent::IncomingCall { call: c, remote } => {
                assert_eq!(c, call);
                assert_eq!(remote, a_id);
            }
            other => panic!("Expected IncomingCall, got {other:?}"),
        }

        b.answer_call(call, b_stream.clone()).await.unwrap();
        match a_rx.recv().await.unwrap() {
            TransportEvent::CallStream { stream, .. } => assert_eq!(stream.id(), b_stream.id()),
            other => panic!("Expected CallStream, got {other:?}"),
        }
        match b_rx.recv().await.unwrap() {
            TransportEvent::CallStream { stream, .. } => assert_eq!(stream.id(), a_stream.id()),
            other => panic!("Expected CallStream, got {other:?}"),
        }

        b.close_call(call).await.unwrap();
        assert!(matches!(
            a_rx.recv().await.unwrap(),
            TransportEvent::CallClosed { .. }
        ));
        assert!(matches!(
            b_rx.recv().await.unwrap(),
            TransportEvent::CallClosed { .. }
        ));
    }

    #[tokio::test]
    async fn test_replace_outbound_video_track() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        let (_b, mut b_rx, b_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;
        expect_identifier(&mut b_rx, &b_id).await;

        let call = CallId::new();
        let a_stream = camera_stream();
        let camera = a_stream.video_track().unwrap().clone();
        a.place_call(call, b_id, a_stream).await.unwrap();
        let _ = b_rx.recv().await; // incoming

        assert_eq!(
            net.outbound_video_track(call, &a_id).unwrap().id(),
            camera.id()
        );

        let capture = MediaTrack::new(TrackKind::Video, TrackSource::Display);
        a.replace_outbound_video_track(call, capture.clone()).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(
            net.outbound_video_track(call, &a_id).unwrap().id(),
            capture.id()
        );

        a.replace_outbound_video_track(call, camera.clone()).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(
            net.outbound_video_track(call, &a_id).unwrap().id(),
            camera.id()
        );
    }

    #[tokio::test]
    async fn test_replace_track_audio_only_is_ignored() {
        let net = MemoryNetwork::new();
        let (a, mut a_rx, a_id) = net.endpoint();
        let (_b, mut b_rx, b_id) = net.endpoint();
        expect_identifier(&mut a_rx, &a_id).await;
        expect_identifier(&mut b_rx, &b_id).await;

        let call = CallId::new();
        let audio_only = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            TrackSource::Microphone,
        )]);
        a.place_call(call, b_id, audio_only).await.unwrap();
        let _ = b_rx.recv().await;

        let capture = MediaTrack::new(TrackKind::Video, TrackSource::Display);
        a.replace_outbound_video_track(call, capture).await.unwrap();
        tokio::task::yield_now().await;
        assert!(net.outbound_video_track(call, &a_id).is_none());
    }
}
