//! Seam to the platform capture subsystem.
//!
//! The coordinator requests streams through a typed command channel with
//! oneshot replies and receives device-initiated events (track endings) on a
//! separate channel, keeping acquisition an explicit suspension point.

use tokio::sync::{mpsc, oneshot};

use duolink_shared::constants::{SCREEN_CAPTURE_FPS, VIDEO_HEIGHT, VIDEO_WIDTH};
use duolink_shared::DeviceError;

use crate::tracks::{MediaStream, TrackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<u32>,
    pub cursor_always_visible: bool,
}

/// What to request from the capture subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: Option<AudioConstraints>,
    pub video: Option<VideoConstraints>,
}

impl MediaConstraints {
    /// Fixed call constraints: processed audio always, HD camera video only
    /// when requested.
    pub fn call(want_video: bool) -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: want_video.then(|| VideoConstraints {
                width: VIDEO_WIDTH,
                height: VIDEO_HEIGHT,
                frame_rate: None,
                cursor_always_visible: false,
            }),
        }
    }

    /// Screen capture constraints: video only at the target frame rate with
    /// the cursor visible. No audio, so the microphone track already in use
    /// by the call is left alone.
    pub fn screen_capture() -> Self {
        Self {
            audio: None,
            video: Some(VideoConstraints {
                width: VIDEO_WIDTH,
                height: VIDEO_HEIGHT,
                frame_rate: Some(SCREEN_CAPTURE_FPS),
                cursor_always_visible: true,
            }),
        }
    }

    pub fn wants_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn wants_video(&self) -> bool {
        self.video.is_some()
    }
}

/// Commands sent *into* the device provider task.
#[derive(Debug)]
pub enum DeviceCommand {
    RequestUserMedia {
        constraints: MediaConstraints,
        reply: oneshot::Sender<Result<MediaStream, DeviceError>>,
    },
    RequestDisplayCapture {
        constraints: MediaConstraints,
        reply: oneshot::Sender<Result<MediaStream, DeviceError>>,
    },
}

/// Events originating at the platform rather than the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A track was ended by the platform, e.g. the user pressed the
    /// browser-level "stop sharing" control.
    TrackEnded { track: TrackId },
}

/// Handle for requesting capture streams.
#[derive(Debug, Clone)]
pub struct DevicesHandle {
    cmd_tx: mpsc::Sender<DeviceCommand>,
}

impl DevicesHandle {
    pub fn new(cmd_tx: mpsc::Sender<DeviceCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn request_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, DeviceError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(DeviceCommand::RequestUserMedia { constraints, reply })
            .await
            .map_err(|_| DeviceError::Capture("device subsystem unavailable".into()))?;
        rx.await
            .map_err(|_| DeviceError::Capture("device subsystem unavailable".into()))?
    }

    pub async fn request_display_capture(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, DeviceError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(DeviceCommand::RequestDisplayCapture { constraints, reply })
            .await
            .map_err(|_| DeviceError::Capture("device subsystem unavailable".into()))?;
        rx.await
            .map_err(|_| DeviceError::Capture("device subsystem unavailable".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_constraints_audio_only() {
        let c = MediaConstraints::call(false);
        assert!(c.wants_audio());
        assert!(!c.wants_video());
        let audio = c.audio.unwrap();
        assert!(audio.echo_cancellation);
        assert!(audio.noise_suppression);
        assert!(audio.auto_gain_control);
    }

    #[test]
    fn test_call_constraints_with_video() {
        let c = MediaConstraints::call(true);
        let video = c.video.unwrap();
        assert_eq!(video.width, 1280);
        assert_eq!(video.height, 720);
        assert_eq!(video.frame_rate, None);
    }

    #[test]
    fn test_screen_capture_constraints() {
        let c = MediaConstraints::screen_capture();
        assert!(!c.wants_audio());
        let video = c.video.unwrap();
        assert_eq!(video.frame_rate, Some(60));
        assert!(video.cursor_always_visible);
    }
}
