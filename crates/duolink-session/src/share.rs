//! Screen-capture ownership while a share is active.
//!
//! The controller owns the capture stream between `start_share` and
//! `stop_share` (or call teardown); the capture track and the camera track
//! are mutually exclusive as the call's outbound video source.

use duolink_media::{MediaStream, MediaTrack, TrackId};

#[derive(Debug, Default)]
pub struct ShareController {
    capture: Option<MediaStream>,
}

impl ShareController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.capture.is_some()
    }

    /// Take ownership of the capture stream for the duration of the share.
    pub fn begin(&mut self, capture: MediaStream) {
        self.capture = Some(capture);
    }

    /// Give up the capture stream for release. `None` when no share is
    /// active, which makes stop paths idempotent.
    pub fn take(&mut self) -> Option<MediaStream> {
        self.capture.take()
    }

    /// The capture video track while sharing.
    pub fn capture_track(&self) -> Option<&MediaTrack> {
        self.capture.as_ref().and_then(|s| s.video_track())
    }

    /// Whether a platform-ended track is the active capture track.
    pub fn owns_track(&self, id: TrackId) -> bool {
        self.capture_track().is_some_and(|t| t.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolink_media::{TrackKind, TrackSource};

    fn capture_stream() -> MediaStream {
        MediaStream::new(vec![MediaTrack::new(TrackKind::Video, TrackSource::Display)])
    }

    #[test]
    fn test_take_is_idempotent() {
        let mut share = ShareController::new();
        assert!(share.take().is_none());

        share.begin(capture_stream());
        assert!(share.is_active());
        assert!(share.take().is_some());
        assert!(!share.is_active());
        assert!(share.take().is_none());
    }

    #[test]
    fn test_owns_track() {
        let mut share = ShareController::new();
        let stream = capture_stream();
        let id = stream.video_track().unwrap().id();
        assert!(!share.owns_track(id));

        share.begin(stream);
        assert!(share.owns_track(id));
        assert!(!share.owns_track(TrackId::new()));
    }
}
