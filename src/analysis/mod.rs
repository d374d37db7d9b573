//! Spectral analysis: one [`AudioBlock`](crate::audio::AudioBlock) in, one
//! [`SpectrumBands`] out.
//!
//! ```text
//! samples → Complex (no window) → FFT → |bin| → mean over low/mid/high ranges
//!         → ÷ per-band divisor → clamp [0,255]
//! samples → mean |x| × volume gain → clamp [0,255]
//! ```

pub mod bands;
pub mod spectrum;

pub use bands::{BandLayout, SpectrumBands};
pub use spectrum::SpectralAnalyzer;
