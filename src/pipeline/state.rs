//! Session state machine and shared status.
//!
//! [`SessionState`] is the control loop's phase.  [`SessionStatus`] is the
//! single source of truth a UI reads: phase, resolved endpoint, the latest
//! band values and counters, and the last fatal error.
//!
//! [`SharedStatus`] is a type alias for `Arc<Mutex<SessionStatus>>`, shared
//! across threads.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::analysis::SpectrumBands;
use crate::config::CaptureVariant;
use crate::discovery::DeviceEndpoint;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Phases of one capture session.
///
/// ```text
/// Idle ──start──▶ Discovering ──endpoint──▶ Capturing ──stop──▶ Stopping ──▶ Idle
///                     │                        │
///                     └── stop / fatal ──▶ Idle └── fatal read ──▶ Stopping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; a start signal is accepted.
    #[default]
    Idle,
    /// Waiting for the controller's advertisement.
    Discovering,
    /// Streaming one frame per audio block.
    Capturing,
    /// Closing the stream and sending the shutdown frame.
    Stopping,
}

impl SessionState {
    /// Returns `true` while a session owns the audio device or socket.
    ///
    /// ```
    /// use audio_led_link::pipeline::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_active());
    /// assert!(SessionState::Discovering.is_active());
    /// assert!(SessionState::Capturing.is_active());
    /// assert!(SessionState::Stopping.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// Short label for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Stopped",
            SessionState::Discovering => "Searching for device",
            SessionState::Capturing => "Running",
            SessionState::Stopping => "Stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Everything a front end needs to render the session.
#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    pub state: SessionState,
    pub variant: CaptureVariant,
    /// Most recently resolved controller.  Survives the end of a session so
    /// an all-off frame can still be sent.
    pub endpoint: Option<DeviceEndpoint>,
    /// Bands of the last analysed block.
    pub last_bands: Option<SpectrumBands>,
    /// Steady-state frames handed to the socket in the current session.
    pub frames_sent: u64,
    /// Datagrams the socket refused in the current session.
    pub send_failures: u64,
    /// Diagnostic of the last fatal error.
    pub error_message: Option<String>,
}

impl SessionStatus {
    pub fn new(variant: CaptureVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }
}

/// Thread-safe handle to [`SessionStatus`].
pub type SharedStatus = Arc<Mutex<SessionStatus>>;

pub fn new_shared_status(variant: CaptureVariant) -> SharedStatus {
    Arc::new(Mutex::new(SessionStatus::new(variant)))
}

/// Lock the status, recovering from a poisoned mutex (the data is plain
/// counters and snapshots, so it stays usable).
pub fn lock_status(status: &SharedStatus) -> MutexGuard<'_, SessionStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
