//! Configuration module for audio-led-link.
//!
//! Provides `AppConfig` (persisted settings), `AppPaths` for cross-platform
//! config directories, and the fixed per-variant [`CaptureProfile`]s that
//! describe how each capture variant samples, analyses and addresses the
//! controller.

pub mod paths;
pub mod profile;
pub mod settings;

pub use paths::AppPaths;
pub use profile::{CaptureProfile, CaptureVariant, SERVICE_COMMAND, SERVICE_COMPUTER, SERVICE_MIC};
pub use settings::{AppConfig, AudioConfig, DiscoveryConfig};
