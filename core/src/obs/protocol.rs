//! obs-websocket 4.x wire types
//!
//! Requests carry a `message-id` echoed in the response; server-pushed
//! events carry an `update-type` instead. The bridge only speaks the
//! auth handshake and consumes the `TransitionBegin` event.

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// The event kind the bridge subscribes to
pub const TRANSITION_BEGIN: &str = "TransitionBegin";

pub fn auth_required_request(message_id: &str) -> Value {
    json!({ "request-type": "GetAuthRequired", "message-id": message_id })
}

pub fn authenticate_request(message_id: &str, auth: &str) -> Value {
    json!({ "request-type": "Authenticate", "message-id": message_id, "auth": auth })
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequired {
    #[serde(rename = "authRequired")]
    pub auth_required: bool,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl RequestStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "request failed".to_string())
    }
}

/// v4 challenge-response: `b64(sha256(b64(sha256(password + salt)) + challenge))`
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let b64 = base64::engine::general_purpose::STANDARD;
    let secret = b64.encode(Sha256::digest(format!("{password}{salt}")));
    b64.encode(Sha256::digest(format!("{secret}{challenge}")))
}

/// `TransitionBegin` notification payload.
///
/// `duration` is reported as -1 for transitions without a fixed
/// duration (cut); the accessor clamps to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionEvent {
    #[serde(rename = "to-scene")]
    pub to_scene: String,
    #[serde(default)]
    duration: i64,
}

impl TransitionEvent {
    pub fn duration_ms(&self) -> u64 {
        self.duration.max(0) as u64
    }
}
