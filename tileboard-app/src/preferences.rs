use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const PREFERENCES_FILE: &str = "preferences.json";
const STORAGE_FILE: &str = "storage.json";
const BOOKMARKS_FILE: &str = "bookmarks.json";

// ---------------------------------------------------------------------------
// Application preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppPreferences {
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    /// Board store file. When empty, `storage.json` next to the executable is used.
    #[serde(default)]
    pub storage_file: String,
    /// Bookmark tree export (WebExtension JSON shape). When empty,
    /// `bookmarks.json` in the config directory is used.
    #[serde(default)]
    pub bookmarks_file: String,
    /// Favicon service URL; `{domain}` is replaced with the link's host.
    #[serde(default = "default_favicon_service")]
    pub favicon_service: String,
    /// Lifetime of ordinary notifications, in seconds.
    #[serde(default = "default_toast_seconds")]
    pub toast_seconds: f32,
}

fn default_window_width() -> f32 {
    1280.0
}
fn default_window_height() -> f32 {
    800.0
}
fn default_favicon_service() -> String {
    tileboard_core::DomainFavicon::default().template
}
fn default_toast_seconds() -> f32 {
    3.0
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            storage_file: String::new(),
            bookmarks_file: String::new(),
            favicon_service: default_favicon_service(),
            toast_seconds: default_toast_seconds(),
        }
    }
}

impl AppPreferences {
    /// Load preferences from next to the executable, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<AppPreferences>(&json) {
                    Ok(prefs) => {
                        info!("Loaded preferences from {}", path.display());
                        return prefs;
                    }
                    Err(e) => {
                        error!("Failed to parse preferences: {e}");
                    }
                },
                Err(e) => {
                    error!("Failed to read preferences file: {e}");
                }
            }
        } else {
            debug!("No preferences file at {}", path.display());
        }
        Self::default()
    }

    /// Persist preferences to disk.
    pub fn save(&self) {
        let path = config_path();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences");
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        match self.storage_file.trim() {
            "" => crate::app_dir::exe_directory().join(STORAGE_FILE),
            custom => PathBuf::from(custom),
        }
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        match self.bookmarks_file.trim() {
            "" => crate::app_dir::config_directory().join(BOOKMARKS_FILE),
            custom => PathBuf::from(custom),
        }
    }

    pub fn toast_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(self.toast_seconds.clamp(0.5, 60.0))
    }
}

fn config_path() -> PathBuf {
    crate::app_dir::exe_directory().join(PREFERENCES_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: AppPreferences = serde_json::from_str(r#"{"window_width": 900}"#).unwrap();
        assert_eq!(prefs.window_width, 900.0);
        assert_eq!(prefs.window_height, default_window_height());
        assert_eq!(prefs.favicon_service, default_favicon_service());
        assert!(prefs.storage_file.is_empty());
    }

    #[test]
    fn custom_paths_win() {
        let prefs = AppPreferences {
            storage_file: "/tmp/board.json".into(),
            ..AppPreferences::default()
        };
        assert_eq!(prefs.storage_path(), PathBuf::from("/tmp/board.json"));
        assert!(AppPreferences::default().storage_path().ends_with(STORAGE_FILE));
    }

    #[test]
    fn toast_duration_is_bounded() {
        let prefs = AppPreferences {
            toast_seconds: 0.0,
            ..AppPreferences::default()
        };
        assert_eq!(prefs.toast_duration(), std::time::Duration::from_millis(500));
    }
}
