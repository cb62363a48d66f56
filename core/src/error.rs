//! Structured error types for the bridge
//!
//! Startup-phase errors (connection, authentication) are fatal and
//! surface to the process boundary; steady-state errors stay inside
//! the dispatch task that hit them.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Transport unreachable. Fatal at startup, never retried at this layer.
    #[error("failed to connect to {target} at {address}: {source}")]
    Connection {
        target: &'static str,
        address: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// Handshake rejected after the single forced-refresh retry. Fatal.
    #[error("authentication with {target} failed: {reason}")]
    Authentication { target: &'static str, reason: String },

    /// The controller refused a request post-handshake. Logged and swallowed
    /// by callers, never escalated.
    #[error("request rejected by {target}: {message}")]
    RequestRejected { target: &'static str, message: String },

    /// Malformed or unexpected wire payload
    #[error("protocol error from {target}: {message}")]
    Protocol { target: &'static str, message: String },

    /// The connection dropped while a request was in flight
    #[error("session with {target} closed unexpectedly")]
    SessionClosed { target: &'static str },

    /// Configuration file could not be read or parsed
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// True for errors that must abort startup with a non-zero exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Connection { .. } | BridgeError::Authentication { .. }
        )
    }
}
