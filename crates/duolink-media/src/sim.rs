//! Simulated capture devices.
//!
//! Fabricates streams matching the requested constraints without touching
//! hardware, for integration tests and the demo binary. Denial of either
//! capture kind can be scripted, replies can be delayed to exercise the
//! coordinator's suspension points, and every issued stream is recorded so
//! tests can assert that no stream is left un-released.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use duolink_shared::constants::CHANNEL_BUFFER;
use duolink_shared::DeviceError;

use crate::devices::{DeviceCommand, DeviceEvent, DevicesHandle, MediaConstraints};
use crate::tracks::{MediaStream, MediaTrack, TrackId, TrackKind, TrackSource};

/// Control surface for the simulated provider.
#[derive(Debug, Clone)]
pub struct SimDeviceControl {
    deny_user_media: Arc<AtomicBool>,
    deny_display_capture: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
    issued: Arc<Mutex<Vec<MediaStream>>>,
    end_tx: mpsc::Sender<TrackId>,
}

impl SimDeviceControl {
    /// Make subsequent user-media requests fail with `PermissionDenied`.
    pub fn deny_user_media(&self, deny: bool) {
        self.deny_user_media.store(deny, Ordering::SeqCst);
    }

    /// Make subsequent display-capture requests fail with `PermissionDenied`.
    pub fn deny_display_capture(&self, deny: bool) {
        self.deny_display_capture.store(deny, Ordering::SeqCst);
    }

    /// Delay every reply, simulating the platform permission prompt.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of streams handed out since spawn.
    pub fn issued_count(&self) -> usize {
        self.issued.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Handles to every stream handed out since spawn, in issue order.
    pub fn issued_streams(&self) -> Vec<MediaStream> {
        self.issued.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Issued streams that still have at least one un-stopped track.
    pub fn live_count(&self) -> usize {
        self.issued
            .lock()
            .map(|v| v.iter().filter(|s| !s.is_released()).count())
            .unwrap_or(0)
    }

    /// End a live track from the platform side, as the browser-level
    /// "stop sharing" control does. The track is stopped and a
    /// `TrackEnded` event is delivered to the coordinator.
    pub async fn end_track(&self, track: TrackId) {
        let _ = self.end_tx.send(track).await;
    }
}

/// Spawn the simulated device provider.
///
/// Returns the capture handle, the device event stream for the coordinator,
/// and the test control surface.
pub fn spawn_sim_devices() -> (
    DevicesHandle,
    mpsc::Receiver<DeviceEvent>,
    SimDeviceControl,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<DeviceCommand>(CHANNEL_BUFFER);
    let (event_tx, event_rx) = mpsc::channel::<DeviceEvent>(CHANNEL_BUFFER);
    let (end_tx, mut end_rx) = mpsc::channel::<TrackId>(CHANNEL_BUFFER);

    let control = SimDeviceControl {
        deny_user_media: Arc::new(AtomicBool::new(false)),
        deny_display_capture: Arc::new(AtomicBool::new(false)),
        latency_ms: Arc::new(AtomicU64::new(0)),
        issued: Arc::new(Mutex::new(Vec::new())),
        end_tx,
    };

    let ctl = control.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("Device command channel closed, stopping sim provider");
                        break;
                    };

                    let latency = ctl.latency_ms.load(Ordering::SeqCst);
                    if latency > 0 {
                        tokio::time::sleep(Duration::from_millis(latency)).await;
                    }

                    match cmd {
                        DeviceCommand::RequestUserMedia { constraints, reply } => {
                            let result = if ctl.deny_user_media.load(Ordering::SeqCst) {
                                Err(DeviceError::PermissionDenied)
                            } else {
                                Ok(fabricate_user_media(&ctl, &constraints))
                            };
                            let _ = reply.send(result);
                        }
                        DeviceCommand::RequestDisplayCapture { reply, .. } => {
                            let result = if ctl.deny_display_capture.load(Ordering::SeqCst) {
                                Err(DeviceError::PermissionDenied)
                            } else {
                                Ok(fabricate_display_capture(&ctl))
                            };
                            let _ = reply.send(result);
                        }
                    }
                }

                ended = end_rx.recv() => {
                    let Some(track_id) = ended else { break };
                    let found = ctl.issued.lock().ok().and_then(|streams| {
                        streams
                            .iter()
                            .flat_map(|s| s.tracks())
                            .find(|t| t.id() == track_id)
                            .cloned()
                    });
                    match found {
                        Some(track) => {
                            track.stop();
                            debug!(track = %track_id, "Platform ended track");
                            let _ = event_tx
                                .send(DeviceEvent::TrackEnded { track: track_id })
                                .await;
                        }
                        None => warn!(track = %track_id, "Cannot end unknown track"),
                    }
                }
            }
        }
    });

    (DevicesHandle::new(cmd_tx), event_rx, control)
}

fn fabricate_user_media(ctl: &SimDeviceControl, constraints: &MediaConstraints) -> MediaStream {
    let mut tracks = Vec::new();
    if constraints.wants_audio() {
        tracks.push(MediaTrack::new(TrackKind::Audio, TrackSource::Microphone));
    }
    if constraints.wants_video() {
        tracks.push(MediaTrack::new(TrackKind::Video, TrackSource::Camera));
    }
    record_issued(ctl, MediaStream::new(tracks))
}

fn fabricate_display_capture(ctl: &SimDeviceControl) -> MediaStream {
    let tracks = vec![MediaTrack::new(TrackKind::Video, TrackSource::Display)];
    record_issued(ctl, MediaStream::new(tracks))
}

fn record_issued(ctl: &SimDeviceControl, stream: MediaStream) -> MediaStream {
    if let Ok(mut issued) = ctl.issued.lock() {
        issued.push(stream.clone());
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_media_request() {
        let (devices, _events, control) = spawn_sim_devices();
        let stream = devices
            .request_user_media(MediaConstraints::call(true))
            .await
            .unwrap();
        assert!(stream.audio_track().is_some());
        assert!(stream.video_track().is_some());
        assert_eq!(control.issued_count(), 1);
        assert_eq!(control.live_count(), 1);

        stream.stop_tracks();
        assert_eq!(control.live_count(), 0);
    }

    #[tokio::test]
    async fn test_audio_only_request() {
        let (devices, _events, _control) = spawn_sim_devices();
        let stream = devices
            .request_user_media(MediaConstraints::call(false))
            .await
            .unwrap();
        assert!(stream.audio_track().is_some());
        assert!(stream.video_track().is_none());
    }

    #[tokio::test]
    async fn test_denied_user_media() {
        let (devices, _events, control) = spawn_sim_devices();
        control.deny_user_media(true);
        let err = devices
            .request_user_media(MediaConstraints::call(true))
            .await
            .unwrap_err();
        assert_eq!(err, DeviceError::PermissionDenied);
        assert_eq!(control.issued_count(), 0);
    }

    #[tokio::test]
    async fn test_display_capture_is_video_only() {
        let (devices, _events, _control) = spawn_sim_devices();
        let stream = devices
            .request_display_capture(MediaConstraints::screen_capture())
            .await
            .unwrap();
        assert!(stream.audio_track().is_none());
        let video = stream.video_track().unwrap();
        assert_eq!(video.source(), TrackSource::Display);
    }

    #[tokio::test]
    async fn test_platform_track_end() {
        let (devices, mut events, control) = spawn_sim_devices();
        let stream = devices
            .request_display_capture(MediaConstraints::screen_capture())
            .await
            .unwrap();
        let track_id = stream.video_track().unwrap().id();

        control.end_track(track_id).await;
        let event = events.recv().await.unwrap();
        assert_eq!(event, DeviceEvent::TrackEnded { track: track_id });
        assert!(stream.video_track().unwrap().is_stopped());
        assert_eq!(control.live_count(), 0);
    }
}
