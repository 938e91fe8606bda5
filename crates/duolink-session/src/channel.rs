//! Text channel tracking.
//!
//! The session holds at most one conversation at a time; a newly connected
//! or incoming channel replaces the current one, and events for replaced
//! channels are recognised as stale by id.

use duolink_shared::{ChannelId, PeerId};

/// The one logical data link to the current conversation partner.
#[derive(Debug, Clone)]
pub struct ChannelLink {
    pub id: ChannelId,
    pub remote: PeerId,
    pub open: bool,
}

#[derive(Debug, Default)]
pub struct ChannelManager {
    current: Option<ChannelLink>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the current (not yet open) link, returning the link it
    /// replaced so the caller can close it at the transport.
    pub fn replace_with(&mut self, id: ChannelId, remote: PeerId) -> Option<ChannelLink> {
        self.current.replace(ChannelLink {
            id,
            remote,
            open: false,
        })
    }

    /// Mark the current link open. Returns false for stale ids.
    pub fn mark_open(&mut self, id: ChannelId) -> bool {
        match self.current.as_mut() {
            Some(link) if link.id == id => {
                link.open = true;
                true
            }
            _ => false,
        }
    }

    /// Drop the current link on a close event. Returns false for stale ids.
    pub fn mark_closed(&mut self, id: ChannelId) -> bool {
        if self.current.as_ref().is_some_and(|link| link.id == id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Drop a link that failed to open. Returns false for stale ids.
    pub fn mark_failed(&mut self, id: ChannelId) -> bool {
        self.mark_closed(id)
    }

    pub fn is_current(&self, id: ChannelId) -> bool {
        self.current.as_ref().is_some_and(|link| link.id == id)
    }

    /// The current link, if it has opened.
    pub fn open_link(&self) -> Option<&ChannelLink> {
        self.current.as_ref().filter(|link| link.open)
    }

    pub fn current(&self) -> Option<&ChannelLink> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> PeerId {
        PeerId::new("remote-peer")
    }

    #[test]
    fn test_open_close_cycle() {
        let mut mgr = ChannelManager::new();
        assert!(mgr.open_link().is_none());

        let id = ChannelId::new();
        assert!(mgr.replace_with(id, remote()).is_none());
        assert!(mgr.open_link().is_none());

        assert!(mgr.mark_open(id));
        assert_eq!(mgr.open_link().unwrap().id, id);

        assert!(mgr.mark_closed(id));
        assert!(mgr.open_link().is_none());
        assert!(mgr.current().is_none());
    }

    #[test]
    fn test_replacement_returns_old_link() {
        let mut mgr = ChannelManager::new();
        let first = ChannelId::new();
        let second = ChannelId::new();

        mgr.replace_with(first, remote());
        mgr.mark_open(first);

        let old = mgr.replace_with(second, remote()).unwrap();
        assert_eq!(old.id, first);
        assert!(mgr.is_current(second));
        assert!(!mgr.is_current(first));
    }

    #[test]
    fn test_stale_events_ignored() {
        let mut mgr = ChannelManager::new();
        let first = ChannelId::new();
        let second = ChannelId::new();

        mgr.replace_with(first, remote());
        mgr.replace_with(second, remote());
        mgr.mark_open(second);

        // Events for the replaced channel must not disturb the current one.
        assert!(!mgr.mark_open(first));
        assert!(!mgr.mark_closed(first));
        assert!(mgr.open_link().is_some());
    }

    #[test]
    fn test_failed_open_clears_link() {
        let mut mgr = ChannelManager::new();
        let id = ChannelId::new();
        mgr.replace_with(id, remote());
        assert!(mgr.mark_failed(id));
        assert!(mgr.current().is_none());
    }
}
