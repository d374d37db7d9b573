//! Audio capture via `cpal`.
//!
//! [`CpalBackend`] resolves the device for a [`StreamSpec`] and opens it in
//! the device's own sample format and channel count, at the profile's rate
//! when the device offers it.  The cpal callback runs on its own audio
//! thread; it converts each buffer with a [`ChannelMap`] to the profile's
//! scale and layout and forwards it over an mpsc channel.
//! [`CpalSource::read_block`] drains that channel into a
//! [`BlockAccumulator`] until a full block is ready.  Dropping the source
//! stops the hardware stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use super::loopback::{find_loopback_match, is_loopback_name};
use super::{
    AudioBackend, AudioBlock, AudioSource, BlockAccumulator, CaptureError, ChannelMap,
    DeviceSelector, StreamSpec, CANCEL_POLL,
};

// ---------------------------------------------------------------------------
// StreamMessage
// ---------------------------------------------------------------------------

/// What the audio thread sends to the reading side.
enum StreamMessage {
    Samples(Vec<f32>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// CpalBackend
// ---------------------------------------------------------------------------

/// Production [`AudioBackend`] built on the platform's cpal host.
#[derive(Debug, Clone)]
pub struct CpalBackend {
    read_timeout: Option<Duration>,
}

impl CpalBackend {
    /// With `Some(bound)`, a block read that sees no samples for `bound`
    /// fails the session.  `None` waits through silence.
    pub fn new(read_timeout: Option<Duration>) -> Self {
        Self { read_timeout }
    }
}

impl AudioBackend for CpalBackend {
    fn open(
        &self,
        spec: &StreamSpec,
        cancel: Arc<AtomicBool>,
    ) -> Result<Box<dyn AudioSource>, CaptureError> {
        let (device, endpoint) = match spec.device {
            DeviceSelector::DefaultOutputLoopback => {
                let host = loopback_host()?;
                loopback_device(&host)?
            }
            DeviceSelector::DefaultInput => {
                let device = cpal::default_host()
                    .default_input_device()
                    .ok_or(CaptureError::NoInputDevice)?;
                (device, Endpoint::Input)
            }
        };

        let native = native_config(&device, endpoint, spec.sample_rate)?;
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        log::info!(
            "capturing from \"{name}\" ({} Hz, {} ch, {:?}) as {} ch {:?}",
            native.config.sample_rate.0,
            native.config.channels,
            native.format,
            spec.channels,
            spec.format
        );
        if native.config.sample_rate.0 != spec.sample_rate {
            log::warn!(
                "device does not offer {} Hz; using its native {} Hz",
                spec.sample_rate,
                native.config.sample_rate.0
            );
        }

        let source = CpalSource::start(&device, &native, spec, cancel, self.read_timeout)?;
        Ok(Box::new(source))
    }
}

/// Which side of the device the stream config is queried from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Input,
    /// A render endpoint opened for loopback capture (WASAPI).
    Output,
}

/// The host that can capture an output device.
///
/// On Windows only WASAPI supports loopback capture; elsewhere the default
/// host exposes monitor sources as ordinary inputs.
fn loopback_host() -> Result<cpal::Host, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        cpal::host_from_id(cpal::HostId::Wasapi)
            .map_err(|_| CaptureError::HostUnavailable("WASAPI"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(cpal::default_host())
    }
}

/// Resolve the loopback device for the host's default output.
fn loopback_device(host: &cpal::Host) -> Result<(cpal::Device, Endpoint), CaptureError> {
    let output = host
        .default_output_device()
        .ok_or(CaptureError::NoOutputDevice)?;
    let output_name = output.name()?;

    // WASAPI can open any render endpoint as a loopback input.
    if cfg!(target_os = "windows") {
        return Ok((output, Endpoint::Output));
    }
    if is_loopback_name(&output_name) {
        return Ok((output, Endpoint::Input));
    }

    let inputs: Vec<cpal::Device> = host.input_devices()?.collect();
    let names: Vec<String> = inputs
        .iter()
        .map(|d| d.name().unwrap_or_default())
        .collect();

    log::debug!("default output \"{output_name}\"; loopback candidates: {names:?}");

    find_loopback_match(&output_name, names.iter().map(String::as_str))
        .and_then(|idx| inputs.into_iter().nth(idx))
        .map(|device| (device, Endpoint::Input))
        .ok_or(CaptureError::NoLoopbackMatch(output_name))
}

// ---------------------------------------------------------------------------
// Stream config negotiation
// ---------------------------------------------------------------------------

/// The format a device will actually accept.
struct NativeConfig {
    config: cpal::StreamConfig,
    format: cpal::SampleFormat,
}

/// Take the device's default format and channel count, and the wanted rate
/// if any supported range with that format and channel count covers it.
fn native_config(
    device: &cpal::Device,
    endpoint: Endpoint,
    wanted_rate: u32,
) -> Result<NativeConfig, CaptureError> {
    let default = match endpoint {
        Endpoint::Input => device.default_input_config()?,
        Endpoint::Output => device.default_output_config()?,
    };
    let format = default.sample_format();
    let channels = default.channels();

    let ranges: Vec<(u32, u32)> = match endpoint {
        Endpoint::Input => device
            .supported_input_configs()?
            .filter(|r| r.sample_format() == format && r.channels() == channels)
            .map(|r| (r.min_sample_rate().0, r.max_sample_rate().0))
            .collect(),
        Endpoint::Output => device
            .supported_output_configs()?
            .filter(|r| r.sample_format() == format && r.channels() == channels)
            .map(|r| (r.min_sample_rate().0, r.max_sample_rate().0))
            .collect(),
    };
    let rate = choose_sample_rate(wanted_rate, default.sample_rate().0, ranges);

    Ok(NativeConfig {
        config: cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        },
        format,
    })
}

/// `wanted` when one of the `(min, max)` ranges contains it, else `native`.
fn choose_sample_rate<I>(wanted: u32, native: u32, ranges: I) -> u32
where
    I: IntoIterator<Item = (u32, u32)>,
{
    if wanted == native {
        return native;
    }
    let offered = ranges
        .into_iter()
        .any(|(min, max)| (min..=max).contains(&wanted));
    if offered {
        wanted
    } else {
        native
    }
}

// ---------------------------------------------------------------------------
// CpalSource
// ---------------------------------------------------------------------------

/// A running cpal input stream cut into fixed-size blocks.
pub struct CpalSource {
    stream: Option<cpal::Stream>,
    closed: bool,
    rx: mpsc::Receiver<StreamMessage>,
    pending: BlockAccumulator,
    sample_rate: u32,
    channels: u16,
    cancel: Arc<AtomicBool>,
    read_timeout: Option<Duration>,
}

impl CpalSource {
    fn start(
        device: &cpal::Device,
        native: &NativeConfig,
        spec: &StreamSpec,
        cancel: Arc<AtomicBool>,
        read_timeout: Option<Duration>,
    ) -> Result<Self, CaptureError> {
        let (tx, rx) = mpsc::channel::<StreamMessage>();
        let map = ChannelMap::new(native.config.channels, spec.channels, spec.format);

        let stream = match native.format {
            cpal::SampleFormat::F32 => build::<f32>(device, &native.config, map, tx)?,
            cpal::SampleFormat::I16 => build::<i16>(device, &native.config, map, tx)?,
            cpal::SampleFormat::U16 => build::<u16>(device, &native.config, map, tx)?,
            cpal::SampleFormat::I32 => build::<i32>(device, &native.config, map, tx)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;

        Ok(Self {
            stream: Some(stream),
            closed: false,
            rx,
            pending: BlockAccumulator::new(spec.samples_per_block()),
            sample_rate: native.config.sample_rate.0,
            channels: spec.channels,
            cancel,
            read_timeout,
        })
    }
}

fn build<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    map: ChannelMap,
    tx: mpsc::Sender<StreamMessage>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let err_tx = tx.clone();
    // Send errors are ignored; the reader may already be gone.
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let _ = tx.send(StreamMessage::Samples(map.apply(data)));
        },
        move |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
            let _ = err_tx.send(StreamMessage::Failed(err.to_string()));
        },
        None,
    )?;
    Ok(stream)
}

impl AudioSource for CpalSource {
    fn read_block(&mut self) -> Result<Option<AudioBlock>, CaptureError> {
        let mut last_data = Instant::now();
        loop {
            if let Some(samples) = self.pending.take_block() {
                return Ok(Some(AudioBlock {
                    samples,
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                }));
            }

            if self.closed {
                return Err(CaptureError::StreamClosed);
            }
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(None);
            }

            match self.rx.recv_timeout(CANCEL_POLL) {
                Ok(StreamMessage::Samples(chunk)) => {
                    last_data = Instant::now();
                    self.pending.push_slice(&chunk);
                }
                Ok(StreamMessage::Failed(msg)) => return Err(CaptureError::Stream(msg)),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Some(limit) = self.read_timeout {
                        if last_data.elapsed() >= limit {
                            return Err(CaptureError::ReadTimeout(limit));
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::StreamClosed)
                }
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pausing audio stream failed: {e}");
            }
            log::debug!("audio stream closed");
        }
        self.pending.clear();
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
