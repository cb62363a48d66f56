//! VTube Studio Public API wire types
//!
//! Every exchange is a JSON envelope over the websocket, correlated by
//! `requestID`. Only the four request kinds the bridge needs are
//! modeled: token request, authentication, hotkey list, hotkey trigger.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub const API_NAME: &str = "VTubeStudioPublicAPI";
pub const API_VERSION: &str = "1.0";

/// Identity presented to VTube Studio; shows up in its plugin list.
pub const PLUGIN_NAME: &str = "OBS-to-VTS";
pub const PLUGIN_DEVELOPER: &str = "Tina";

#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    #[serde(rename = "apiName")]
    pub api_name: &'static str,
    #[serde(rename = "apiVersion")]
    pub api_version: &'static str,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "messageType")]
    pub message_type: &'static str,
    pub data: serde_json::Value,
}

impl RequestEnvelope {
    fn new(message_type: &'static str, data: serde_json::Value) -> Self {
        Self {
            api_name: API_NAME,
            api_version: API_VERSION,
            request_id: Uuid::new_v4().to_string(),
            message_type,
            data,
        }
    }

    pub fn token_request() -> Self {
        Self::new(
            "AuthenticationTokenRequest",
            json!({
                "pluginName": PLUGIN_NAME,
                "pluginDeveloper": PLUGIN_DEVELOPER,
            }),
        )
    }

    pub fn authentication_request(token: &str) -> Self {
        Self::new(
            "AuthenticationRequest",
            json!({
                "pluginName": PLUGIN_NAME,
                "pluginDeveloper": PLUGIN_DEVELOPER,
                "authenticationToken": token,
            }),
        )
    }

    pub fn hotkey_list_request() -> Self {
        Self::new("HotkeysInCurrentModelRequest", json!({}))
    }

    pub fn trigger_request(hotkey_id: &str) -> Self {
        Self::new("HotkeyTriggerRequest", json!({ "hotkeyID": hotkey_id }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "requestID", default)]
    pub request_id: String,
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ResponseEnvelope {
    pub fn is_error(&self) -> bool {
        self.message_type == "APIError"
    }

    pub fn error_message(&self) -> String {
        self.data
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown API error")
            .to_string()
    }
}

/// One remotely triggerable hotkey as VTube Studio reports it.
///
/// `kind` stays an open string: VTS can grow new hotkey types and an
/// unrecognized one must never be fatal. Auxiliary metadata is carried
/// through untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct Hotkey {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: String,
    #[serde(rename = "hotkeyID")]
    pub id: String,
    #[serde(rename = "keyCombination", default)]
    pub keys: Vec<i64>,
    #[serde(rename = "onScreenButtonID", default)]
    pub button_id: i64,
}

impl Hotkey {
    pub fn kind(&self) -> HotkeyKind {
        HotkeyKind::parse(&self.kind)
    }
}

/// Recognized hotkey types, for log display only. Control flow never
/// branches on this; unknown values pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyKind {
    TriggerAnimation,
    ToggleExpression,
    RemoveAllExpressions,
    MoveModel,
    Other(String),
}

impl HotkeyKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "TriggerAnimation" => HotkeyKind::TriggerAnimation,
            "ToggleExpression" => HotkeyKind::ToggleExpression,
            "RemoveAllExpressions" => HotkeyKind::RemoveAllExpressions,
            "MoveModel" => HotkeyKind::MoveModel,
            other => HotkeyKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HotkeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyKind::TriggerAnimation => write!(f, "TriggerAnimation"),
            HotkeyKind::ToggleExpression => write!(f, "ToggleExpression"),
            HotkeyKind::RemoveAllExpressions => write!(f, "RemoveAllExpressions"),
            HotkeyKind::MoveModel => write!(f, "MoveModel"),
            HotkeyKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Snapshot of the hotkeys the model currently exposes, keyed by name.
///
/// Fetched fresh for every lookup; the set changes whenever the user
/// edits their model, so a stale snapshot must never serve a lookup.
#[derive(Debug, Clone, Default)]
pub struct HotkeyCatalog {
    by_name: HashMap<String, Hotkey>,
}

impl HotkeyCatalog {
    pub fn from_hotkeys(hotkeys: Vec<Hotkey>) -> Self {
        Self {
            by_name: hotkeys.into_iter().map(|h| (h.name.clone(), h)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Hotkey> {
        self.by_name.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
