//! Scene-to-hotkey resolution
//!
//! Exact-match lookup against the configured table, falling back to
//! the default hotkey. No normalization: scene names are case and
//! whitespace sensitive and must match the config exactly.

use std::collections::HashMap;

pub fn resolve<'a>(
    scenes_to_hotkeys: &'a HashMap<String, String>,
    default_hotkey: Option<&'a str>,
    scene: &str,
) -> Option<&'a str> {
    scenes_to_hotkeys
        .get(scene)
        .map(String::as_str)
        .or(default_hotkey)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("Gaming".to_string(), "Game Pose".to_string());
        map.insert("Just Chatting".to_string(), "Relax Pose".to_string());
        map
    }

    #[test]
    fn test_mapped_scene_returns_configured_hotkey() {
        let map = mapping();
        assert_eq!(resolve(&map, Some("Idle"), "Gaming"), Some("Game Pose"));
        assert_eq!(
            resolve(&map, Some("Idle"), "Just Chatting"),
            Some("Relax Pose")
        );
    }

    #[test]
    fn test_unmapped_scene_falls_back_to_default() {
        let map = mapping();
        assert_eq!(resolve(&map, Some("Idle"), "Ending"), Some("Idle"));
    }

    #[test]
    fn test_unmapped_scene_without_default_resolves_to_nothing() {
        let map = mapping();
        assert_eq!(resolve(&map, None, "Ending"), None);
    }

    #[test]
    fn test_matching_is_exact() {
        let map = mapping();
        // Case and whitespace both matter
        assert_eq!(resolve(&map, None, "gaming"), None);
        assert_eq!(resolve(&map, None, "Gaming "), None);
        assert_eq!(resolve(&map, None, " Gaming"), None);
    }

    #[test]
    fn test_empty_mapping_uses_default() {
        let map = HashMap::new();
        assert_eq!(resolve(&map, Some("Idle"), "Anything"), Some("Idle"));
        assert_eq!(resolve(&map, None, "Anything"), None);
    }
}
