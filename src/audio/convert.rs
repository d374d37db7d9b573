//! Device-native samples to the numeric scale and channel layout of a
//! [`StreamSpec`](super::StreamSpec).
//!
//! Devices are opened in whatever format they natively deliver (WASAPI
//! loopback is almost always 32-bit float).  The band divisors, however,
//! assume the profile's format: i16 profiles expect values in
//! `[-32768, 32767]`, f32 profiles expect `[-1.0, 1.0]`.  [`ChannelMap`]
//! bridges the two inside the cpal callback.

use cpal::{FromSample, Sample};

use super::SampleFormat;

/// Factor taking unit-range samples to the scale of `format`.
pub fn scale_for(format: SampleFormat) -> f32 {
    match format {
        SampleFormat::I16 => 32768.0,
        SampleFormat::F32 => 1.0,
    }
}

/// Converts interleaved native frames to the profile's layout.
///
/// * same channel count: copied
/// * to mono: frames are averaged
/// * otherwise: output channel `c` takes input channel `min(c, from - 1)`,
///   so extra inputs are dropped and a mono input is duplicated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMap {
    from: u16,
    to: u16,
    gain: f32,
}

impl ChannelMap {
    pub fn new(from: u16, to: u16, target: SampleFormat) -> Self {
        Self {
            from,
            to,
            gain: scale_for(target),
        }
    }

    /// Convert one callback buffer.  A trailing partial frame is dropped.
    pub fn apply<T>(&self, data: &[T]) -> Vec<f32>
    where
        T: Sample,
        f32: FromSample<T>,
    {
        let from = self.from as usize;
        let to = self.to as usize;
        if from == 0 || to == 0 {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(data.len() / from * to);
        for frame in data.chunks_exact(from) {
            if from == to {
                out.extend(frame.iter().map(|&s| s.to_sample::<f32>() * self.gain));
            } else if to == 1 {
                let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                out.push(sum / from as f32 * self.gain);
            } else {
                for c in 0..to {
                    out.push(frame[c.min(from - 1)].to_sample::<f32>() * self.gain);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn native_i16_keeps_exact_values_for_i16_profile() {
        let map = ChannelMap::new(2, 2, SampleFormat::I16);
        let out = map.apply(&[100i16, -200, 32767, -32768]);
        assert_eq!(out, vec![100.0, -200.0, 32767.0, -32768.0]);
    }

    /// Float loopback feeding the computer profile lands on the i16 scale.
    #[test]
    fn native_f32_is_rescaled_for_i16_profile() {
        let map = ChannelMap::new(2, 2, SampleFormat::I16);
        assert_eq!(map.apply(&[0.5f32, -1.0]), vec![16384.0, -32768.0]);
    }

    #[test]
    fn native_i16_is_normalised_for_f32_profile() {
        let map = ChannelMap::new(1, 1, SampleFormat::F32);
        assert_eq!(map.apply(&[16384i16, -32768]), vec![0.5, -1.0]);
    }

    #[test]
    fn u16_midpoint_is_silence() {
        let map = ChannelMap::new(1, 1, SampleFormat::F32);
        assert_eq!(map.apply(&[32768u16]), vec![0.0]);
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        let map = ChannelMap::new(2, 1, SampleFormat::F32);
        assert!(close(&map.apply(&[0.2f32, 0.4, -1.0, 1.0]), &[0.3, 0.0]));
    }

    #[test]
    fn mono_is_duplicated_to_stereo() {
        let map = ChannelMap::new(1, 2, SampleFormat::F32);
        assert_eq!(map.apply(&[0.25f32, -0.5]), vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn surround_keeps_front_pair() {
        let map = ChannelMap::new(4, 2, SampleFormat::F32);
        let out = map.apply(&[0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        assert!(close(&out, &[0.1, 0.2, 0.5, 0.6]));
    }

    #[test]
    fn partial_frame_is_dropped() {
        let map = ChannelMap::new(2, 2, SampleFormat::F32);
        assert_eq!(map.apply(&[0.5f32, 0.5, 0.25]).len(), 2);
    }
}
