//! The audio-source seam used by the control loop.
//!
//! [`AudioBackend::open`] turns a [`StreamSpec`] into a boxed
//! [`AudioSource`]; the control loop then pulls one [`AudioBlock`] per tick
//! with [`AudioSource::read_block`].  The production backend is
//! [`crate::audio::CpalBackend`]; tests supply scripted sources.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::AudioBlock;

// ---------------------------------------------------------------------------
// StreamSpec
// ---------------------------------------------------------------------------

/// Which physical device a stream is opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Loopback capture of the system's default output device.
    DefaultOutputLoopback,
    /// The system's default input (microphone).
    DefaultInput,
}

/// Numeric scale blocks are delivered in.  The device itself is opened in
/// its native format and converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 16-bit integer scale, `[-32768, 32767]`.
    I16,
    /// Unit float scale, `[-1.0, 1.0]`.
    F32,
}

/// Fixed description of the stream a capture variant opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub device: DeviceSelector,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames (samples per channel) delivered per block.
    pub frames_per_block: usize,
    pub format: SampleFormat,
}

impl StreamSpec {
    /// Interleaved samples per block (`frames_per_block × channels`).
    pub fn samples_per_block(&self) -> usize {
        self.frames_per_block * self.channels as usize
    }

    /// Wall-clock time the device needs to fill one block.
    pub fn block_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames_per_block as f64 / self.sample_rate as f64)
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or reading an audio stream.
///
/// Every variant is fatal for the session that hit it.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("required audio host {0} is not available")]
    HostUnavailable(&'static str),

    #[error("no default output device found")]
    NoOutputDevice,

    #[error("no loopback device matches default output \"{0}\"")]
    NoLoopbackMatch(String),

    #[error("no input device found on the default audio host")]
    NoInputDevice,

    #[error("failed to query device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to query supported stream configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("device sample format {0} is not supported")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("audio stream closed")]
    StreamClosed,

    #[error("no audio received for {0:?}")]
    ReadTimeout(Duration),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An open capture stream.
///
/// Implementations release the device on [`close`](Self::close) and again on
/// drop, so calling `close` is optional but idempotent.
pub trait AudioSource {
    /// Block until exactly one full block is available and return it.
    ///
    /// Silence on the device keeps the call waiting.  Returns `Ok(None)`
    /// once the cancel flag given to [`AudioBackend::open`] is set; the
    /// flag is re-checked every [`CANCEL_POLL`].
    fn read_block(&mut self) -> Result<Option<AudioBlock>, CaptureError>;

    /// Stop the stream and release the device.
    fn close(&mut self);
}

/// Opens [`AudioSource`]s.  Shared between sessions, hence `Send + Sync`.
pub trait AudioBackend: Send + Sync {
    /// Open a stream for `spec`.  Reads on the returned source give up when
    /// `cancel` is set.
    fn open(
        &self,
        spec: &StreamSpec,
        cancel: Arc<AtomicBool>,
    ) -> Result<Box<dyn AudioSource>, CaptureError>;
}

/// How often a waiting [`AudioSource::read_block`] looks at its cancel flag.
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

// Compile-time assertion: Box<dyn AudioSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioSource>, _: Box<dyn AudioBackend>) {}
};
