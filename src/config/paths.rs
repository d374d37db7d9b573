//! Where `settings.toml` lives.
//!
//! `dirs::config_dir()/audio-led-link/settings.toml`, e.g.
//! `~/.config/audio-led-link/settings.toml` on Linux or
//! `%APPDATA%\audio-led-link\settings.toml` on Windows.  The current
//! directory is used when the platform reports no config dir.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "audio-led-link";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(&base)
    }

    /// Paths rooted at `base` instead of the platform config dir.
    pub fn under(base: &Path) -> Self {
        let config_dir = base.join(APP_DIR);
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_paths_end_in_app_dir() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with(APP_DIR));
        assert_eq!(paths.settings_file.parent(), Some(paths.config_dir.as_path()));
    }

    #[test]
    fn rooted_paths() {
        let paths = AppPaths::under(Path::new("/tmp/x"));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/x/audio-led-link"));
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/tmp/x/audio-led-link/settings.toml")
        );
    }
}
