//! Start/stop lifecycle around [`ControlLoop`].
//!
//! ```text
//! SessionCommand (tokio mpsc)
//!        │
//!        ▼
//! SessionController::run()  ← async tokio task
//!        │
//!        ├─ Start       → reap finished session, spawn "capture-session" thread
//!        ├─ Stop        → set stop flag, join via spawn_blocking
//!        ├─ ForceAllOff → stop, then one shutdown frame to the last endpoint
//!        └─ SetEffect / SetColor → ParamCell (seen on the next frame)
//!
//! capture-session thread: ControlLoop::run() ──▶ SessionEvent::{Finished, Failed}
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use crate::audio::AudioBackend;
use crate::config::{CaptureProfile, DiscoveryConfig};
use crate::discovery::ServiceBrowser;
use crate::net::UdpTransmitter;
use crate::protocol::{Color, EffectSelection, OutputFrame};

use super::params::{ParamCell, ParamSource};
use super::runner::{ControlLoop, SessionError, SessionSummary};
use super::state::{lock_status, SessionState, SharedStatus};

/// Signals accepted by [`SessionController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
    /// Stop any session, then switch the LEDs off.
    ForceAllOff,
    SetEffect(EffectSelection),
    SetColor(Color),
}

/// Notifications for a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Finished(SessionSummary),
    Failed { message: String },
    /// A command could not be honoured (e.g. start while running).
    Rejected { message: String },
    AllOff { sent: bool },
}

struct ActiveSession {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<SessionSummary, SessionError>>,
}

/// Owns at most one live capture session.
pub struct SessionController {
    profile: CaptureProfile,
    discovery: DiscoveryConfig,
    browser: Arc<dyn ServiceBrowser>,
    backend: Arc<dyn AudioBackend>,
    params: Arc<ParamCell>,
    status: SharedStatus,
    events: Option<mpsc::Sender<SessionEvent>>,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(
        profile: CaptureProfile,
        discovery: DiscoveryConfig,
        browser: Arc<dyn ServiceBrowser>,
        backend: Arc<dyn AudioBackend>,
        params: Arc<ParamCell>,
        status: SharedStatus,
    ) -> Self {
        Self {
            profile,
            discovery,
            browser,
            backend,
            params,
            status,
            events: None,
            active: None,
        }
    }

    /// Report lifecycle events on `events`.  Sends never block; events are
    /// dropped when the channel is full.
    pub fn with_events(mut self, events: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn params(&self) -> &Arc<ParamCell> {
        &self.params
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    /// `true` while a session thread is alive.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    // -----------------------------------------------------------------------
    // Start / stop
    // -----------------------------------------------------------------------

    /// Spawn a new session.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyRunning`] when a session is still live, or
    /// [`SessionError::Spawn`] when the OS refuses a new thread.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_running() {
            log::warn!("session: start ignored, already running");
            return Err(SessionError::AlreadyRunning);
        }
        // A session that already ended still holds its join handle.
        if let Some(finished) = self.active.take() {
            let _ = join(finished.handle);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let control = ControlLoop::new(
            self.profile.clone(),
            &self.discovery,
            Arc::clone(&self.browser),
            Arc::clone(&self.backend),
            Arc::clone(&self.params) as Arc<dyn ParamSource>,
            Arc::clone(&self.status),
            Arc::clone(&stop),
        );
        {
            let mut st = lock_status(&self.status);
            st.state = SessionState::Discovering;
            st.frames_sent = 0;
            st.send_failures = 0;
        }

        let events = self.events.clone();
        let handle = thread::Builder::new()
            .name("capture-session".into())
            .spawn(move || {
                let result = control.run();
                if let Some(events) = events {
                    let event = match &result {
                        Ok(summary) => SessionEvent::Finished(*summary),
                        Err(e) => SessionEvent::Failed {
                            message: e.to_string(),
                        },
                    };
                    if events.try_send(event).is_err() {
                        log::debug!("session: event dropped");
                    }
                }
                result
            })
            .map_err(|e| {
                lock_status(&self.status).state = SessionState::Idle;
                SessionError::Spawn(e)
            })?;

        log::info!("session: started ({})", self.profile.variant.label());
        self.active = Some(ActiveSession { stop, handle });
        Ok(())
    }

    /// Signal the live session to stop and wait for it on the blocking pool.
    ///
    /// Returns `Ok(None)` when no session was running.
    pub async fn stop(&mut self) -> Result<Option<SessionSummary>, SessionError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        active.stop.store(true, Ordering::SeqCst);

        match tokio::task::spawn_blocking(move || join(active.handle)).await {
            Ok(result) => result.map(Some),
            Err(e) => {
                log::warn!("session: join task failed: {e}");
                Err(SessionError::Panicked)
            }
        }
    }

    /// [`stop`](Self::stop) for callers outside an async runtime.
    pub fn stop_blocking(&mut self) -> Result<Option<SessionSummary>, SessionError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        active.stop.store(true, Ordering::SeqCst);
        join(active.handle).map(Some)
    }

    /// Send one shutdown frame to the most recently resolved endpoint.
    ///
    /// Returns `Ok(false)` when no device has been found yet.  Does not stop
    /// a live session.
    pub fn force_all_off(&self) -> io::Result<bool> {
        let endpoint = lock_status(&self.status).endpoint.clone();
        match endpoint {
            Some(endpoint) => {
                UdpTransmitter::send_once(&OutputFrame::Shutdown, &endpoint)?;
                log::info!("session: all-off sent to {}", endpoint.socket_addr());
                Ok(true)
            }
            None => {
                log::warn!("session: all-off skipped, no device found yet");
                Ok(false)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Command loop
    // -----------------------------------------------------------------------

    /// Consume commands until the channel closes, then stop any live
    /// session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        while let Some(command) = commands.recv().await {
            log::debug!("session: command {command:?}");
            match command {
                SessionCommand::Start => match self.start() {
                    Ok(()) => self.emit(SessionEvent::Started),
                    Err(e) => self.emit(SessionEvent::Rejected {
                        message: e.to_string(),
                    }),
                },
                SessionCommand::Stop => {
                    // The session thread reports its own outcome.
                    let _ = self.stop().await;
                }
                SessionCommand::ForceAllOff => {
                    let _ = self.stop().await;
                    let sent = match self.force_all_off() {
                        Ok(sent) => sent,
                        Err(e) => {
                            log::warn!("session: all-off failed: {e}");
                            false
                        }
                    };
                    self.emit(SessionEvent::AllOff { sent });
                }
                SessionCommand::SetEffect(effect) => self.params.set_effect(effect),
                SessionCommand::SetColor(color) => self.params.set_color(color),
            }
        }

        log::info!("session: command channel closed, controller shutting down");
        let _ = self.stop().await;
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if events.try_send(event).is_err() {
                log::debug!("session: event dropped");
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.stop.store(true, Ordering::SeqCst);
        }
    }
}

fn join(
    handle: JoinHandle<Result<SessionSummary, SessionError>>,
) -> Result<SessionSummary, SessionError> {
    handle.join().unwrap_or(Err(SessionError::Panicked))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
