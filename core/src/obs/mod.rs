//! OBS source session: obs-websocket 4.x protocol types and the
//! event-delivering connection.

pub mod protocol;
pub mod session;

pub use protocol::{TransitionEvent, TRANSITION_BEGIN};
pub use session::{EventHandler, ObsHandle, ObsSession};
