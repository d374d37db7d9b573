//! Audio blocks and the accumulator that cuts a cpal stream into them.
//!
//! cpal delivers buffers of whatever size the host chooses.  The control loop
//! needs fixed-size blocks, so [`BlockAccumulator`] collects incoming samples
//! and hands out exactly `block_len` samples at a time, keeping any remainder
//! for the next block.  It never returns a partial block.
//!
//! # Example
//!
//! ```rust
//! use audio_led_link::audio::BlockAccumulator;
//!
//! let mut acc = BlockAccumulator::new(4);
//! acc.push_slice(&[1.0, 2.0, 3.0]);
//! assert!(acc.take_block().is_none());
//! acc.push_slice(&[4.0, 5.0]);
//! assert_eq!(acc.take_block(), Some(vec![1.0, 2.0, 3.0, 4.0]));
//! assert_eq!(acc.len(), 1);
//! ```

// ---------------------------------------------------------------------------
// AudioBlock
// ---------------------------------------------------------------------------

/// One fixed-size run of interleaved samples, created once per tick.
///
/// Samples are in the scale of the profile's [`SampleFormat`]: `I16`
/// profiles see values in `[-32768, 32767]`, `F32` profiles `[-1.0, 1.0]`.
///
/// [`SampleFormat`]: super::SampleFormat
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Interleaved PCM samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl AudioBlock {
    /// Number of frames (samples per channel) in the block.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Time it takes the device to fill one block of this size.
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

// ---------------------------------------------------------------------------
// BlockAccumulator
// ---------------------------------------------------------------------------

/// Collects arbitrary-sized sample buffers into fixed-size blocks.
pub struct BlockAccumulator {
    pending: Vec<f32>,
    block_len: usize,
}

impl BlockAccumulator {
    /// Create an accumulator producing blocks of `block_len` samples.
    ///
    /// # Panics
    ///
    /// Panics if `block_len == 0`.
    pub fn new(block_len: usize) -> Self {
        assert!(block_len > 0, "block length must be > 0");
        Self {
            pending: Vec::with_capacity(block_len * 2),
            block_len,
        }
    }

    /// Append samples from one device callback.
    pub fn push_slice(&mut self, data: &[f32]) {
        self.pending.extend_from_slice(data);
    }

    /// Remove and return the oldest complete block, if one is available.
    pub fn take_block(&mut self) -> Option<Vec<f32>> {
        if self.pending.len() < self.block_len {
            return None;
        }
        let rest = self.pending.split_off(self.block_len);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Discard all pending samples.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of samples waiting for the next block.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
