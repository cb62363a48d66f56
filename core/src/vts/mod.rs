//! VTube Studio controller session: protocol types, token storage,
//! and the authenticated websocket client.

pub mod protocol;
pub mod session;
pub mod token;

pub use protocol::{Hotkey, HotkeyCatalog, HotkeyKind};
pub use session::VtsClient;
pub use token::{TokenStore, DEFAULT_TOKEN_FILE};
