// Session and call-state coordinator: one text channel, one media call,
// live outbound-track substitution during an active call.

pub mod call;
pub mod channel;
pub mod events;
pub mod session;
pub mod share;

pub use call::{CallSession, RemoteAttach};
pub use channel::{ChannelLink, ChannelManager};
pub use events::SessionNotification;
pub use session::{spawn_session, SessionClosed, SessionCommand, SessionConfig, SessionHandle};
pub use share::ShareController;
