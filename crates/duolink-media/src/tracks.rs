//! Handles to live media tracks and streams.
//!
//! Actual capture and rendering belong to the platform; the coordinator only
//! needs identity, liveness, and the enabled flag. Clones of a track or
//! stream are handles to the same underlying state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Display,
}

/// One outbound or inbound media track.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: TrackId,
    kind: TrackKind,
    source: TrackSource,
    stopped: Arc<AtomicBool>,
    enabled: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, source: TrackSource) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            source,
            stopped: Arc::new(AtomicBool::new(false)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    /// Stop the track. Returns `true` only for the call that actually
    /// performed the stop, so release paths can assert exactly-once.
    pub fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Enable or disable the track without stopping it (mute support).
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of tracks obtained from one capture request (camera+mic, or a
/// display capture). Exclusively owned by one component at a time; the owner
/// stops the tracks on exactly one teardown path.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: StreamId,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: StreamId::new(),
            tracks,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    /// Stop every track. Returns how many tracks this call stopped.
    pub fn stop_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    /// True once all tracks are stopped.
    pub fn is_released(&self) -> bool {
        self.tracks.iter().all(|t| t.is_stopped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_stops_once() {
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Camera);
        assert!(!track.is_stopped());
        assert!(track.stop());
        assert!(!track.stop());
        assert!(track.is_stopped());
    }

    #[test]
    fn test_clone_shares_state() {
        let track = MediaTrack::new(TrackKind::Audio, TrackSource::Microphone);
        let handle = track.clone();
        track.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_enabled_flag() {
        let track = MediaTrack::new(TrackKind::Audio, TrackSource::Microphone);
        assert!(track.is_enabled());
        track.set_enabled(false);
        assert!(!track.is_enabled());
        let handle = track.clone();
        assert!(!handle.is_enabled());
    }

    #[test]
    fn test_stream_release() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, TrackSource::Microphone),
            MediaTrack::new(TrackKind::Video, TrackSource::Camera),
        ]);
        assert!(!stream.is_released());
        assert_eq!(stream.stop_tracks(), 2);
        assert!(stream.is_released());
        assert_eq!(stream.stop_tracks(), 0);
    }

    #[test]
    fn test_stream_track_lookup() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, TrackSource::Microphone),
            MediaTrack::new(TrackKind::Video, TrackSource::Camera),
        ]);
        assert_eq!(stream.audio_track().unwrap().source(), TrackSource::Microphone);
        assert_eq!(stream.video_track().unwrap().source(), TrackSource::Camera);

        let audio_only = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            TrackSource::Microphone,
        )]);
        assert!(audio_only.video_track().is_none());
    }
}
