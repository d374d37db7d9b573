//! Fixed per-variant capture profiles.
//!
//! Each [`CaptureVariant`] has exactly one [`CaptureProfile`]: the stream
//! layout the audio device is opened with, the FFT band layout and scaling
//! constants, and the mDNS service type plus port policy used to locate the
//! controller.  None of these are runtime-tunable.
//!
//! | Variant  | Rate  | Frames | Ch | Format | Service                    |
//! |----------|-------|--------|----|--------|----------------------------|
//! | Computer | 48000 | 1024   | 2  | i16    | `_led-audio._udp.local.`   |
//! | Mic      | 44100 | 2048   | 1  | f32    | `_esp8266-mic._udp.local.` |

use serde::{Deserialize, Serialize};

use crate::analysis::BandLayout;
use crate::audio::{DeviceSelector, SampleFormat, StreamSpec};
use crate::discovery::{PortPolicy, DEFAULT_PORT};

/// Service type advertised by the loopback-driven controller firmware.
pub const SERVICE_COMPUTER: &str = "_led-audio._udp.local.";

/// Service type advertised by the microphone-driven controller firmware.
pub const SERVICE_MIC: &str = "_esp8266-mic._udp.local.";

/// Generic service type used by the discrete-command console.
pub const SERVICE_COMMAND: &str = "_udp._udp.local.";

// ---------------------------------------------------------------------------
// CaptureVariant
// ---------------------------------------------------------------------------

/// Which audio input drives the telemetry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureVariant {
    /// Loopback of the system's default output device.
    #[default]
    Computer,
    /// Default microphone input.
    Mic,
}

impl CaptureVariant {
    /// Parse a variant name as typed on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "computer" | "loopback" => Some(Self::Computer),
            "mic" | "microphone" => Some(Self::Mic),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Computer => "computer",
            Self::Mic => "mic",
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureProfile
// ---------------------------------------------------------------------------

/// Everything the control loop needs to know about one capture variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureProfile {
    pub variant: CaptureVariant,
    /// How the audio device is opened.
    pub stream: StreamSpec,
    /// FFT bin ranges and scaling constants.
    pub bands: BandLayout,
    /// mDNS service type browsed before capture starts.
    pub service_type: &'static str,
    /// How the destination port is chosen once the device is found.
    pub port: PortPolicy,
}

impl CaptureProfile {
    /// Loopback capture: 48 kHz stereo i16, 1024-frame blocks.
    ///
    /// The FFT runs over all 2048 interleaved samples of a block.
    pub fn computer() -> Self {
        Self {
            variant: CaptureVariant::Computer,
            stream: StreamSpec {
                device: DeviceSelector::DefaultOutputLoopback,
                sample_rate: 48_000,
                channels: 2,
                frames_per_block: 1024,
                format: SampleFormat::I16,
            },
            bands: BandLayout {
                low: 0..10,
                mid: 10..30,
                high: 30..50,
                low_divisor: 8000.0,
                mid_divisor: 2500.0,
                high_divisor: 2500.0,
                volume_gain: 255.0 * 2.0,
            },
            service_type: SERVICE_COMPUTER,
            port: PortPolicy::Fixed(DEFAULT_PORT),
        }
    }

    /// Microphone capture: 44.1 kHz mono f32, 2048-frame blocks.
    pub fn mic() -> Self {
        Self {
            variant: CaptureVariant::Mic,
            stream: StreamSpec {
                device: DeviceSelector::DefaultInput,
                sample_rate: 44_100,
                channels: 1,
                frames_per_block: 2048,
                format: SampleFormat::F32,
            },
            bands: BandLayout {
                low: 0..20,
                mid: 20..50,
                high: 50..200,
                low_divisor: 1.0 / 255.0,
                mid_divisor: 1.0 / 255.0,
                high_divisor: 1.0 / 255.0,
                volume_gain: 255.0 * 5.0,
            },
            service_type: SERVICE_MIC,
            port: PortPolicy::Fixed(DEFAULT_PORT),
        }
    }

    pub fn for_variant(variant: CaptureVariant) -> Self {
        match variant {
            CaptureVariant::Computer => Self::computer(),
            CaptureVariant::Mic => Self::mic(),
        }
    }

    /// Replace the fixed destination port (e.g. from `settings.toml`).
    ///
    /// Has no effect on profiles that honour the advertised port.
    pub fn with_fixed_port(mut self, port: u16) -> Self {
        if let PortPolicy::Fixed(_) = self.port {
            self.port = PortPolicy::Fixed(port);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computer_profile_constants() {
        let p = CaptureProfile::computer();
        assert_eq!(p.stream.sample_rate, 48_000);
        assert_eq!(p.stream.channels, 2);
        assert_eq!(p.stream.frames_per_block, 1024);
        assert_eq!(p.stream.format, SampleFormat::I16);
        assert_eq!(p.stream.samples_per_block(), 2048);
        assert_eq!(p.service_type, "_led-audio._udp.local.");
        assert_eq!(p.port, PortPolicy::Fixed(7778));
    }

    #[test]
    fn mic_profile_constants() {
        let p = CaptureProfile::mic();
        assert_eq!(p.stream.sample_rate, 44_100);
        assert_eq!(p.stream.channels, 1);
        assert_eq!(p.stream.frames_per_block, 2048);
        assert_eq!(p.stream.format, SampleFormat::F32);
        assert_eq!(p.bands.high, 50..200);
        assert_eq!(p.service_type, "_esp8266-mic._udp.local.");
    }

    #[test]
    fn service_types_are_distinct() {
        assert_ne!(SERVICE_COMPUTER, SERVICE_MIC);
        assert_ne!(SERVICE_COMPUTER, SERVICE_COMMAND);
        assert_ne!(SERVICE_MIC, SERVICE_COMMAND);
    }

    #[test]
    fn band_ranges_fit_inside_the_fft() {
        for p in [CaptureProfile::computer(), CaptureProfile::mic()] {
            assert!(p.bands.high.end <= p.stream.samples_per_block());
        }
    }

    #[test]
    fn with_fixed_port_overrides_port() {
        let p = CaptureProfile::mic().with_fixed_port(9000);
        assert_eq!(p.port, PortPolicy::Fixed(9000));
    }

    #[test]
    fn parse_variant_names() {
        assert_eq!(CaptureVariant::parse("computer"), Some(CaptureVariant::Computer));
        assert_eq!(CaptureVariant::parse("MIC"), Some(CaptureVariant::Mic));
        assert_eq!(CaptureVariant::parse("speaker"), None);
    }
}
