//! FFT band-energy analyzer built on `rustfft`.
//!
//! The full block (all interleaved samples) is transformed without a
//! window.  Only magnitudes of the bins named by the [`BandLayout`] are
//! used, so no normalisation is applied to the transform.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::bands::{mean_over, to_byte};
use super::{BandLayout, SpectrumBands};
use crate::audio::AudioBlock;

/// Turns audio blocks into [`SpectrumBands`].
///
/// Buffers are reused between calls; a new FFT plan is made only when the
/// block length changes.
pub struct SpectralAnalyzer {
    layout: BandLayout,
    planner: FftPlanner<f32>,
    fft: Option<Arc<dyn Fft<f32>>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(layout: BandLayout) -> Self {
        Self {
            layout,
            planner: FftPlanner::new(),
            fft: None,
            buffer: Vec::new(),
            scratch: Vec::new(),
            magnitudes: Vec::new(),
        }
    }

    /// Analyze one block.
    ///
    /// An empty block is treated as silence.
    pub fn analyze(&mut self, block: &AudioBlock) -> SpectrumBands {
        let samples = &block.samples;
        if samples.is_empty() {
            return SpectrumBands::SILENT;
        }

        let volume = mean_abs(samples) * self.layout.volume_gain;

        self.transform(samples);

        let low = mean_over(&self.magnitudes, &self.layout.low) / self.layout.low_divisor;
        let mid = mean_over(&self.magnitudes, &self.layout.mid) / self.layout.mid_divisor;
        let high = mean_over(&self.magnitudes, &self.layout.high) / self.layout.high_divisor;

        SpectrumBands {
            volume: to_byte(volume),
            low: to_byte(low),
            mid: to_byte(mid),
            high: to_byte(high),
        }
    }

    /// Magnitudes of the most recent transform.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    fn transform(&mut self, samples: &[f32]) {
        let len = samples.len();
        let fft = match &self.fft {
            Some(fft) if fft.len() == len => Arc::clone(fft),
            _ => {
                let fft = self.planner.plan_fft_forward(len);
                self.scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
                self.fft = Some(Arc::clone(&fft));
                fft
            }
        };

        self.buffer.clear();
        self.buffer
            .extend(samples.iter().map(|&s| Complex::new(s, 0.0)));

        fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.magnitudes.clear();
        self.magnitudes.extend(self.buffer.iter().map(|c| c.norm()));
    }
}

fn mean_abs(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureProfile;

    fn block(samples: Vec<f32>, channels: u16) -> AudioBlock {
        AudioBlock {
            samples,
            sample_rate: 48_000,
            channels,
        }
    }

    fn computer() -> SpectralAnalyzer {
        SpectralAnalyzer::new(CaptureProfile::computer().bands)
    }

    fn mic() -> SpectralAnalyzer {
        SpectralAnalyzer::new(CaptureProfile::mic().bands)
    }

    /// A sine with an integer number of cycles over `len` samples.
    fn sine(len: usize, cycles: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|n| {
                amplitude
                    * (2.0 * std::f64::consts::PI * cycles as f64 * n as f64 / len as f64).sin()
                        as f32
            })
            .collect()
    }

    // ---- Silence / saturation ---------------------------------------------

    #[test]
    fn silence_is_all_zero_for_both_variants() {
        let silent = block(vec![0.0; 2048], 2);
        assert_eq!(computer().analyze(&silent), SpectrumBands::SILENT);
        assert_eq!(mic().analyze(&silent), SpectrumBands::SILENT);
    }

    #[test]
    fn empty_block_is_silence() {
        assert_eq!(mic().analyze(&block(Vec::new(), 1)), SpectrumBands::SILENT);
    }

    #[test]
    fn full_scale_i16_saturates_volume() {
        let loud = block(vec![32767.0; 2048], 2);
        let bands = computer().analyze(&loud);
        assert_eq!(bands.volume, 255);
        assert_eq!(bands.low, 255);
    }

    #[test]
    fn full_scale_f32_saturates_volume() {
        let loud = block(vec![-1.0; 2048], 1);
        assert_eq!(mic().analyze(&loud).volume, 255);
    }

    #[test]
    fn full_scale_alternating_saturates_volume() {
        let samples = (0..2048).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(mic().analyze(&block(samples, 1)).volume, 255);
    }

    // ---- Band placement ----------------------------------------------------

    /// A DC offset lands entirely in bin 0 (the low band).
    #[test]
    fn dc_offset_only_feeds_low_band() {
        // bin0 = 2048 × 100 = 204 800; mean over 10 bins / 8000 = 2.56
        let bands = computer().analyze(&block(vec![100.0; 2048], 2));
        assert_eq!(bands, SpectrumBands::new(255, 2, 0, 0));
    }

    /// A quiet sine centred on bin 30 only lights the mic mid band.
    #[test]
    fn sine_in_mid_range_only_feeds_mid_band() {
        // |bin30| = 2048 × 0.001 / 2 = 1.024; mean over 30 bins × 255 = 8.7
        let bands = mic().analyze(&block(sine(2048, 30, 0.001), 1));
        assert_eq!(bands.low, 0);
        assert_eq!(bands.mid, 8);
        assert_eq!(bands.high, 0);
        assert_eq!(bands.volume, 0);
    }

    #[test]
    fn sine_in_high_range_only_feeds_high_band() {
        let bands = mic().analyze(&block(sine(2048, 100, 0.01), 1));
        assert_eq!(bands.low, 0);
        assert_eq!(bands.mid, 0);
        assert!(bands.high > 0);
    }

    // ---- Plan reuse --------------------------------------------------------

    #[test]
    fn block_length_change_replans() {
        let mut analyzer = mic();
        analyzer.analyze(&block(vec![0.1; 2048], 1));
        assert_eq!(analyzer.magnitudes().len(), 2048);

        analyzer.analyze(&block(vec![0.1; 512], 1));
        assert_eq!(analyzer.magnitudes().len(), 512);
    }

    #[test]
    fn repeated_analysis_is_deterministic() {
        let mut analyzer = computer();
        let input = block(sine(2048, 20, 3000.0), 2);
        let first = analyzer.analyze(&input);
        let second = analyzer.analyze(&input);
        assert_eq!(first, second);
    }
}
