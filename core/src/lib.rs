pub mod bridge;
pub mod config;
pub mod error;
pub mod obs;
pub mod vts;

// Re-exports for convenience
pub use bridge::{Bridge, BridgeContext, BridgeState};
pub use config::Config;
pub use error::BridgeError;
