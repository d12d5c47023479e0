//! Where Tileboard keeps its files. Preferences and the board store live
//! next to the executable so a standalone copy carries its own board.

use std::path::PathBuf;

/// Directory containing the running executable. Falls back to current directory if unavailable.
pub fn exe_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Per-user configuration directory, used for the bookmark tree export.
pub fn config_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "Tileboard")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(exe_directory)
}

/// Starting folder for export dialogs: the user's downloads, if known.
pub fn downloads_directory() -> Option<PathBuf> {
    directories::UserDirs::new().and_then(|d| d.download_dir().map(PathBuf::from))
}
