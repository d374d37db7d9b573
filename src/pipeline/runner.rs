//! The control loop: discover → open audio → block → bands → frame → UDP.
//!
//! [`ControlLoop::run`] drives exactly one session on the calling thread and
//! returns when the stop flag is observed or a fatal error occurs.
//!
//! # Session flow
//!
//! ```text
//! Discovering  discover(service_type)            stop flag checked per poll
//!     │
//!     ▼        bind UDP socket, open AudioSource  (fatal: no frame sent)
//! Capturing    loop {
//!                  stop flag? → break
//!                  read_block → analyze → encode(params.current) → send
//!              }                                  (send errors counted, ignored)
//!     │
//!     ▼
//! Stopping     close stream, send SHUTDOWN once, drop socket
//!     │
//!     ▼
//! Idle         (set by a guard on every exit path, including panics)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::analysis::SpectralAnalyzer;
use crate::audio::{AudioBackend, AudioSource, CaptureError, CANCEL_POLL};
use crate::config::{CaptureProfile, DiscoveryConfig};
use crate::discovery::{
    discover, DeviceEndpoint, DiscoveryError, DiscoveryRequest, ServiceBrowser,
};
use crate::net::{Transmitter, UdpTransmitter};
use crate::protocol::{encode, OutputFrame};

use super::params::ParamSource;
use super::state::{lock_status, SessionState, SharedStatus};

// ---------------------------------------------------------------------------
// SessionError / SessionSummary
// ---------------------------------------------------------------------------

/// Errors that end (or prevent) a capture session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a capture session is already running")]
    AlreadyRunning,

    #[error("device discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("audio capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("failed to open UDP socket: {0}")]
    Socket(#[source] std::io::Error),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture thread panicked")]
    Panicked,
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// Steady-state frames accepted by the socket.
    pub frames_sent: u64,
    /// Frames the socket refused.
    pub send_failures: u64,
    /// Whether the session reached `Capturing`.
    pub captured: bool,
    /// Whether the shutdown frame left the socket.
    pub shutdown_sent: bool,
}

// ---------------------------------------------------------------------------
// ControlLoop
// ---------------------------------------------------------------------------

/// One capture session's worth of collaborators.
pub struct ControlLoop {
    profile: CaptureProfile,
    discovery: DiscoveryRequest,
    browser: Arc<dyn ServiceBrowser>,
    backend: Arc<dyn AudioBackend>,
    params: Arc<dyn ParamSource>,
    status: SharedStatus,
    stop: Arc<AtomicBool>,
}

impl ControlLoop {
    /// # Arguments
    ///
    /// * `profile`: fixed stream/band/service constants of the variant.
    /// * `discovery`: poll interval and optional bound.
    /// * `browser`: advertisement source (e.g. `MdnsBrowser`).
    /// * `backend`: audio backend (e.g. `CpalBackend`).
    /// * `params`: effect/color provider, polled once per block.
    /// * `status`: shared status updated as the session progresses.
    /// * `stop`: cooperative stop flag, checked once per block.
    pub fn new(
        profile: CaptureProfile,
        discovery: &DiscoveryConfig,
        browser: Arc<dyn ServiceBrowser>,
        backend: Arc<dyn AudioBackend>,
        params: Arc<dyn ParamSource>,
        status: SharedStatus,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let discovery = DiscoveryRequest {
            service_type: profile.service_type.to_string(),
            port: profile.port,
            poll_interval: discovery.poll_interval(),
            timeout: discovery.timeout(),
        };
        Self {
            profile,
            discovery,
            browser,
            backend,
            params,
            status,
            stop,
        }
    }

    /// Longest a stop request waits before the loop notices it: one block,
    /// or one cancel poll while the device is silent.
    pub fn stop_latency(&self) -> Duration {
        self.profile.stream.block_duration().max(CANCEL_POLL)
    }

    /// Run one session to completion.
    ///
    /// A stop during discovery ends the session cleanly with nothing sent.
    /// A fatal error before capture starts sends no frame at all; a read
    /// failure during capture still goes through `Stopping` so the LEDs are
    /// switched off.
    pub fn run(&self) -> Result<SessionSummary, SessionError> {
        let _idle = IdleOnExit(&self.status);
        {
            let mut st = lock_status(&self.status);
            st.frames_sent = 0;
            st.send_failures = 0;
            st.last_bands = None;
            st.error_message = None;
        }

        // ── 1. Discovering ──────────────────────────────────────────────
        self.set_state(SessionState::Discovering);
        let endpoint = match discover(self.browser.as_ref(), &self.discovery, &self.stop) {
            Ok(endpoint) => endpoint,
            Err(DiscoveryError::Cancelled) => {
                log::info!("session: stopped while discovering");
                return Ok(SessionSummary::default());
            }
            Err(e) => return Err(self.fail(e.into())),
        };
        lock_status(&self.status).endpoint = Some(endpoint.clone());

        // ── 2. Acquire socket and audio stream ──────────────────────────
        let transmitter = UdpTransmitter::bind_for(&endpoint)
            .map_err(|e| self.fail(SessionError::Socket(e)))?;
        let mut source = self
            .backend
            .open(&self.profile.stream, Arc::clone(&self.stop))
            .map_err(|e| self.fail(e.into()))?;

        // ── 3. Capturing ────────────────────────────────────────────────
        self.set_state(SessionState::Capturing);
        let mut summary = SessionSummary {
            captured: true,
            ..SessionSummary::default()
        };
        let outcome = self.capture(source.as_mut(), &transmitter, &endpoint, &mut summary);

        // ── 4. Stopping ─────────────────────────────────────────────────
        self.set_state(SessionState::Stopping);
        source.close();
        drop(source);

        summary.shutdown_sent = match transmitter.send(&OutputFrame::Shutdown, &endpoint) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("session: shutdown frame not sent: {e}");
                false
            }
        };
        drop(transmitter);

        match outcome {
            Ok(()) => {
                log::info!(
                    "session: stopped after {} frames ({} send failures)",
                    summary.frames_sent,
                    summary.send_failures
                );
                Ok(summary)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn capture(
        &self,
        source: &mut dyn AudioSource,
        transmitter: &dyn Transmitter,
        endpoint: &DeviceEndpoint,
        summary: &mut SessionSummary,
    ) -> Result<(), SessionError> {
        let mut analyzer = SpectralAnalyzer::new(self.profile.bands.clone());
        log::info!(
            "session: streaming to {} ({})",
            endpoint.socket_addr(),
            self.profile.variant.label()
        );

        while !self.stop.load(Ordering::SeqCst) {
            // `None`: stopped while the device was silent.
            let Some(block) = source.read_block()? else {
                break;
            };
            let bands = analyzer.analyze(&block);
            let frame = encode(bands, self.params.frame_params(self.profile.variant));

            match transmitter.send(&frame, endpoint) {
                Ok(_) => summary.frames_sent += 1,
                Err(e) => {
                    summary.send_failures += 1;
                    log::debug!("session: frame dropped: {e}");
                }
            }

            log::trace!("session: {bands:?}");

            let mut st = lock_status(&self.status);
            st.last_bands = Some(bands);
            st.frames_sent = summary.frames_sent;
            st.send_failures = summary.send_failures;
        }

        Ok(())
    }

    fn set_state(&self, state: SessionState) {
        log::debug!("session: → {state:?}");
        lock_status(&self.status).state = state;
    }

    fn fail(&self, err: SessionError) -> SessionError {
        log::error!("session error: {err}");
        lock_status(&self.status).error_message = Some(err.to_string());
        err
    }
}

/// Returns the status to `Idle` however the session ends.
struct IdleOnExit<'a>(&'a SharedStatus);

impl Drop for IdleOnExit<'_> {
    fn drop(&mut self) {
        lock_status(self.0).state = SessionState::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
