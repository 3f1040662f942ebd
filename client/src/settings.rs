use std::fs;
use std::path::{Path, PathBuf};

use ew_core::constants::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH, MAX_MAP_SIZE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_HOST: &str = "localhost";
pub const DEFAULT_SERVER_PORT: u16 = 13327;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Server address used when none is given on the command line.
    pub server_host: String,
    /// Server port used when none is given on the command line.
    pub server_port: u16,

    /// Viewport size requested via `setup mapsize`.
    pub map_width: usize,
    pub map_height: usize,

    /// Optional log file; stderr is always logged to.
    pub log_file: Option<String>,
    /// Directory for decoded face images; `None` disables the disk cache.
    pub face_cache_dir: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            log_file: None,
            face_cache_dir: None,
        }
    }
}

impl UserSettings {
    /// Viewport dimensions clamped to what 5-bit wire coordinates can carry.
    pub fn map_size(&self) -> (usize, usize) {
        (
            self.map_width.clamp(1, MAX_MAP_SIZE),
            self.map_height.clamp(1, MAX_MAP_SIZE),
        )
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, format!("{json}\n"))?;
        Ok(())
    }
}

pub fn default_settings_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".emberwake").join("settings.json");
    } else if let Ok(appdata) = std::env::var("APPDATA") {
        return PathBuf::from(appdata).join(".emberwake").join("settings.json");
    }

    log::info!("Using fallback settings path: ./settings.json");
    PathBuf::from("settings.json")
}

/// Loads settings from disk, falling back to defaults when the file is
/// missing or unparseable.
pub fn load_settings_from_disk(path: &Path) -> UserSettings {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return UserSettings::default(),
    };

    match serde_json::from_slice::<UserSettings>(&bytes) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to parse settings file {:?}: {e}", path);
            UserSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_named_constants() {
        let s = UserSettings::default();
        assert_eq!(s.server_host, DEFAULT_SERVER_HOST);
        assert_eq!(s.server_port, DEFAULT_SERVER_PORT);
        assert_eq!(s.map_size(), (DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT));
        assert!(s.log_file.is_none());
    }

    #[test]
    fn partial_json_fills_missing_fields_from_defaults() {
        let parsed: UserSettings =
            serde_json::from_str(r#"{ "server_host": "play.example.org" }"#).unwrap();
        assert_eq!(parsed.server_host, "play.example.org");
        assert_eq!(parsed.server_port, DEFAULT_SERVER_PORT);
        assert_eq!(parsed.map_width, DEFAULT_MAP_WIDTH);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("ew-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut s = UserSettings::default();
        s.server_host = "game.example.org".to_string();
        s.map_width = 25;
        s.face_cache_dir = Some("/tmp/faces".to_string());
        s.save(&path).unwrap();

        let loaded = load_settings_from_disk(&path);
        assert_eq!(loaded.server_host, "game.example.org");
        assert_eq!(loaded.map_width, 25);
        assert_eq!(loaded.face_cache_dir.as_deref(), Some("/tmp/faces"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn oversized_map_requests_are_clamped() {
        let mut s = UserSettings::default();
        s.map_width = 99;
        s.map_height = 0;
        assert_eq!(s.map_size(), (MAX_MAP_SIZE, 1));
    }
}
