//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{AppPaths, CaptureProfile, CaptureVariant};
use crate::discovery::DEFAULT_PORT;
use crate::protocol::{Color, EffectSelection};

// ---------------------------------------------------------------------------
// DiscoveryConfig
// ---------------------------------------------------------------------------

/// Settings for locating the controller on the local network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Destination port used by variants with a fixed-port policy.
    pub port: u16,
    /// How often the browser is polled (and "searching…" logged).
    pub poll_interval_ms: u64,
    /// Give up after this many seconds.  `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            poll_interval_ms: 1000,
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the capture stream that are not part of the fixed profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Fail the session when a block read sees no samples for this long.
    /// `None` waits through any amount of silence.
    pub read_timeout_ms: Option<u64>,
}

impl AudioConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use audio_led_link::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// let profile = config.profile();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture variant started by default.
    pub variant: CaptureVariant,
    /// Initial effect for the computer variant.
    pub effect: EffectSelection,
    /// Initial LED color for the mic variant.
    pub color: Color,
    pub discovery: DiscoveryConfig,
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: CaptureVariant::default(),
            effect: EffectSelection::default(),
            color: Color::default(),
            discovery: DiscoveryConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The fixed profile for the configured variant, with the configured
    /// destination port applied.
    pub fn profile(&self) -> CaptureProfile {
        CaptureProfile::for_variant(self.variant).with_fixed_port(self.discovery.port)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::PortPolicy;
    use tempfile::tempdir;

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.variant, CaptureVariant::Computer);
        assert_eq!(config.effect, EffectSelection::Lofi);
        assert_eq!(config.discovery.port, 7778);
        assert!(config.discovery.timeout_secs.is_none());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.color, Color::new(100, 0, 255));
        assert_eq!(cfg.discovery.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.discovery.timeout(), None);
        assert_eq!(cfg.audio.read_timeout(), None);
    }

    /// Modified non-default values survive a save/load cycle.
    #[test]
    fn modified_values_survive_save_and_load() {
        let dir = tempdir().expect("temp dir");
        let path = AppPaths::under(dir.path()).settings_file;

        let mut cfg = AppConfig::default();
        cfg.variant = CaptureVariant::Mic;
        cfg.effect = EffectSelection::WavesOutside;
        cfg.color = Color::new(1, 2, 3);
        cfg.discovery.timeout_secs = Some(30);
        cfg.discovery.port = 9000;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.variant, CaptureVariant::Mic);
        assert_eq!(loaded.effect, EffectSelection::WavesOutside);
        assert_eq!(loaded.color, Color::new(1, 2, 3));
        assert_eq!(loaded.discovery.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(loaded.discovery.port, 9000);
    }

    /// A partial file only overrides what it names.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "variant = \"mic\"\n\n[discovery]\ntimeout_secs = 5\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");

        assert_eq!(cfg.variant, CaptureVariant::Mic);
        assert_eq!(cfg.discovery.timeout_secs, Some(5));
        assert_eq!(cfg.discovery.poll_interval_ms, 1000);
        assert_eq!(cfg.effect, EffectSelection::Lofi);
    }

    #[test]
    fn profile_applies_configured_port() {
        let mut cfg = AppConfig::default();
        cfg.discovery.port = 4242;
        assert_eq!(cfg.profile().port, PortPolicy::Fixed(4242));
        assert_eq!(cfg.profile().variant, CaptureVariant::Computer);
    }
}
