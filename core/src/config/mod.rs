//! Configuration management
//!
//! One YAML file (`config.yml` in the working directory) holds the
//! connection settings for both ends of the bridge plus the
//! scene-to-hotkey mapping table. A commented default file is written
//! on first run.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// OBS WebSocket (4.x) connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsConfig {
    pub address: String,
    pub port: u16,
    #[serde(deserialize_with = "string_or_number")]
    pub password: Option<String>,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 4444,
            password: None,
        }
    }
}

/// VTube Studio API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VtsConfig {
    pub address: String,
    pub port: u16,
}

impl Default for VtsConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 8001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub obs: ObsConfig,
    pub vts: VtsConfig,
    pub transition_delay_ms: u64,
    pub transition_delay_half: bool,
    pub scenes_to_hotkeys: HashMap<String, String>,
    pub default_hotkey: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut scenes_to_hotkeys = HashMap::new();
        scenes_to_hotkeys.insert("Scene".to_string(), "My Animation 1".to_string());
        scenes_to_hotkeys.insert("Scene 2".to_string(), "My Animation 2".to_string());
        scenes_to_hotkeys.insert("Scene 3".to_string(), "My Animation 3".to_string());

        Self {
            obs: ObsConfig::default(),
            vts: VtsConfig::default(),
            transition_delay_ms: 0,
            transition_delay_half: false,
            scenes_to_hotkeys,
            default_hotkey: Some("My Animation 1".to_string()),
        }
    }
}

/// Command-line overrides applied on top of the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vts_host: Option<String>,
    pub vts_port: Option<u16>,
    pub obs_host: Option<String>,
    pub obs_port: Option<u16>,
    pub obs_password: Option<String>,
}

impl Config {
    /// Load the config file, writing a commented default first if it
    /// does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file not found, creating default {}", path.display());
            std::fs::write(path, default_config_yaml())?;
        }

        let raw = std::fs::read_to_string(path)?;
        serde_yml::from_str(&raw).map_err(|e| BridgeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.vts_host {
            self.vts.address = host.clone();
        }
        if let Some(port) = overrides.vts_port {
            self.vts.port = port;
        }
        if let Some(host) = &overrides.obs_host {
            self.obs.address = host.clone();
        }
        if let Some(port) = overrides.obs_port {
            self.obs.port = port;
        }
        if let Some(password) = &overrides.obs_password {
            self.obs.password = Some(password.clone());
        }
    }
}

/// The default config file, with the comments users actually need.
pub fn default_config_yaml() -> &'static str {
    r#"obs:
  address: localhost
  port: 4444
  password: null

vts:
  address: localhost
  port: 8001

# Delay in milliseconds before triggering the hotkey after a scene change
# Useful if you want to hide the transition behind a stinger video, in this
# case, you probably want to match the value of the Transition Point in OBS
# Set to 0 to disable
transition_delay_ms: 0

# Set to true to wait half of the transition delay before triggering the hotkey
# This bypasses the transition_delay_ms setting entirely
transition_delay_half: false

scenes_to_hotkeys:
  "Scene": "My Animation 1"
  "Scene 2": "My Animation 2"
  "Scene 3": "My Animation 3"

# Hotkey to trigger when no scene match is found
# Set to null to disable changing the animation in that case
# Not recommended, it's best to have a default animation.
default_hotkey: "My Animation 1"
"#
}

/// Accepts both `password: 1234` and `password: "1234"`. OBS passwords
/// are strings, but YAML happily parses digit-only ones as numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, a number, or null")
        }

        fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, d: D2) -> std::result::Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            d.deserialize_any(Visitor)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }
    }

    deserializer.deserialize_option(Visitor)
}
