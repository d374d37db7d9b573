//! Band layout constants and the analyzer's output type.

use std::ops::Range;

// ---------------------------------------------------------------------------
// SpectrumBands
// ---------------------------------------------------------------------------

/// Loudness plus three band energies, each already scaled to a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpectrumBands {
    pub volume: u8,
    pub low: u8,
    pub mid: u8,
    pub high: u8,
}

impl SpectrumBands {
    pub const SILENT: SpectrumBands = SpectrumBands {
        volume: 0,
        low: 0,
        mid: 0,
        high: 0,
    };

    pub fn new(volume: u8, low: u8, mid: u8, high: u8) -> Self {
        Self {
            volume,
            low,
            mid,
            high,
        }
    }
}

// ---------------------------------------------------------------------------
// BandLayout
// ---------------------------------------------------------------------------

/// FFT bin ranges and scaling for one capture variant.
///
/// A band's byte value is `mean(|bin|) / divisor`, clamped to `[0, 255]`
/// and truncated.  `volume` is `mean(|sample|) × volume_gain`, clamped the
/// same way.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    pub low: Range<usize>,
    pub mid: Range<usize>,
    pub high: Range<usize>,
    pub low_divisor: f32,
    pub mid_divisor: f32,
    pub high_divisor: f32,
    pub volume_gain: f32,
}

/// Clamp to the byte range and truncate toward zero.  NaN maps to 0.
pub fn to_byte(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

/// Mean of `values[range]`, with the range cut to what is available.
///
/// An empty (or fully out-of-bounds) range has a mean of 0.
pub fn mean_over(values: &[f32], range: &Range<usize>) -> f32 {
    let end = range.end.min(values.len());
    let start = range.start.min(end);
    let slice = &values[start..end];
    if slice.is_empty() {
        return 0.0;
    }
    slice.iter().sum::<f32>() / slice.len() as f32
}
