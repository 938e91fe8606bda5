//! Call session data and guarded transitions.
//!
//! `CallSession` exists only while a call is pending or active; the session
//! loop holding `Option<CallSession>` represents `Idle` as `None`, so no
//! state can be re-entered without a fresh user action.

use duolink_media::MediaStream;
use duolink_shared::{CallId, CallKind, CallState, PeerId};

/// One active or pending media call.
#[derive(Debug)]
pub struct CallSession {
    pub id: CallId,
    pub remote: PeerId,
    pub kind: CallKind,
    pub state: CallState,
    pub local_stream: Option<MediaStream>,
    pub remote_stream: Option<MediaStream>,
}

/// Outcome of a remote stream arriving from the transport.
#[derive(Debug, PartialEq, Eq)]
pub enum RemoteAttach {
    /// First attachment; the call advanced from Outgoing to Active.
    NowActive,
    /// First attachment on an already-active call (callee side).
    AlreadyActive,
    /// Duplicate or out-of-state attachment; nothing changed.
    Ignored,
}

impl CallSession {
    /// A dialled call: local media is already in hand when it is created.
    pub fn outgoing(id: CallId, remote: PeerId, kind: CallKind, local_stream: MediaStream) -> Self {
        Self {
            id,
            remote,
            kind,
            state: CallState::Outgoing,
            local_stream: Some(local_stream),
            remote_stream: None,
        }
    }

    /// A ringing incoming call. The transport carries no audio/video hint,
    /// so the callee requests camera and microphone on accept.
    pub fn incoming(id: CallId, remote: PeerId) -> Self {
        Self {
            id,
            remote,
            kind: CallKind::AudioVideo,
            state: CallState::IncomingRinging,
            local_stream: None,
            remote_stream: None,
        }
    }

    /// Record the answer: local media attached, call active.
    pub fn answered(&mut self, local_stream: MediaStream) {
        self.local_stream = Some(local_stream);
        self.state = CallState::Active;
    }

    /// Attach the remote stream. Valid once per call, and only after the
    /// call left the ringing state.
    pub fn attach_remote(&mut self, stream: MediaStream) -> RemoteAttach {
        if self.state == CallState::IncomingRinging || self.remote_stream.is_some() {
            return RemoteAttach::Ignored;
        }
        self.remote_stream = Some(stream);
        if self.state == CallState::Active {
            RemoteAttach::AlreadyActive
        } else {
            self.state = CallState::Active;
            RemoteAttach::NowActive
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == CallState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolink_media::{MediaTrack, TrackKind, TrackSource};

    fn stream() -> MediaStream {
        MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, TrackSource::Microphone),
            MediaTrack::new(TrackKind::Video, TrackSource::Camera),
        ])
    }

    fn peer() -> PeerId {
        PeerId::new("remote")
    }

    #[test]
    fn test_caller_path() {
        let mut call = CallSession::outgoing(CallId::new(), peer(), CallKind::AudioVideo, stream());
        assert_eq!(call.state, CallState::Outgoing);
        assert!(!call.is_active());

        assert_eq!(call.attach_remote(stream()), RemoteAttach::NowActive);
        assert!(call.is_active());
        assert!(call.remote_stream.is_some());
    }

    #[test]
    fn test_callee_path() {
        let mut call = CallSession::incoming(CallId::new(), peer());
        assert_eq!(call.state, CallState::IncomingRinging);
        assert!(call.local_stream.is_none());

        // Remote stream before answer is out of order.
        assert_eq!(call.attach_remote(stream()), RemoteAttach::Ignored);
        assert!(call.remote_stream.is_none());

        call.answered(stream());
        assert!(call.is_active());
        assert_eq!(call.attach_remote(stream()), RemoteAttach::AlreadyActive);
    }

    #[test]
    fn test_remote_stream_attaches_once() {
        let mut call = CallSession::outgoing(CallId::new(), peer(), CallKind::Audio, stream());
        let first = stream();
        assert_eq!(call.attach_remote(first.clone()), RemoteAttach::NowActive);
        assert_eq!(call.attach_remote(stream()), RemoteAttach::Ignored);
        assert_eq!(call.remote_stream.as_ref().unwrap().id(), first.id());
    }
}
