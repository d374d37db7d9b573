//! Audio acquisition: device selection → cpal stream → fixed-size blocks.
//!
//! # Pipeline
//!
//! ```text
//! default output ──loopback match──┐
//! default input ───────────────────┴─▶ cpal callback → StreamMessage (mpsc)
//!                                      → BlockAccumulator → AudioBlock
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use audio_led_link::audio::{AudioBackend, CpalBackend};
//! use audio_led_link::config::CaptureProfile;
//!
//! let backend = CpalBackend::new(None);
//! let cancel = Arc::new(AtomicBool::new(false));
//! let mut source = backend.open(&CaptureProfile::mic().stream, cancel).unwrap();
//! if let Some(block) = source.read_block().unwrap() {
//!     println!("{} samples @ {} Hz", block.samples.len(), block.sample_rate);
//! }
//! source.close();
//! ```

pub mod block;
pub mod capture;
pub mod convert;
pub mod loopback;
pub mod source;

pub use block::{AudioBlock, BlockAccumulator};
pub use capture::{CpalBackend, CpalSource};
pub use convert::ChannelMap;
pub use loopback::{find_loopback_match, is_loopback_name};
pub use source::{
    AudioBackend, AudioSource, CaptureError, DeviceSelector, SampleFormat, StreamSpec, CANCEL_POLL,
};
