//! Session orchestration: discovery, capture and streaming for one variant.
//!
//! # Architecture
//!
//! ```text
//! SessionCommand (mpsc)
//!        │
//!        ▼
//! SessionController::run()  ← async tokio task
//!        │
//!        ├─ Start → "capture-session" thread
//!        │            └─ ControlLoop::run()
//!        │                 Discovering → Capturing → Stopping → Idle
//!        │                 AudioSource → SpectralAnalyzer → encode → UdpTransmitter
//!        │
//!        └─ SetEffect / SetColor → ParamCell (ArcSwap) ──▶ read once per block
//!
//! SharedStatus (Arc<Mutex<SessionStatus>>) ←─── read by the front end
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use audio_led_link::audio::CpalBackend;
//! use audio_led_link::config::AppConfig;
//! use audio_led_link::discovery::MdnsBrowser;
//! use audio_led_link::pipeline::{new_shared_status, ParamCell, SessionCommand, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let profile = config.profile();
//!     let controller = SessionController::new(
//!         profile.clone(),
//!         config.discovery.clone(),
//!         Arc::new(MdnsBrowser::new()?),
//!         Arc::new(CpalBackend::new(None)),
//!         Arc::new(ParamCell::new(config.effect, config.color)),
//!         new_shared_status(profile.variant),
//!     );
//!
//!     let (tx, rx) = mpsc::channel(8);
//!     let task = tokio::spawn(controller.run(rx));
//!     tx.send(SessionCommand::Start).await?;
//!     // ...
//!     tx.send(SessionCommand::Stop).await?;
//!     drop(tx);
//!     task.await?;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod params;
pub mod runner;
pub mod state;

#[cfg(test)]
pub(crate) mod fakes;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{SessionCommand, SessionController, SessionEvent};
pub use params::{ParamCell, ParamSource};
pub use runner::{ControlLoop, SessionError, SessionSummary};
pub use state::{lock_status, new_shared_status, SessionState, SessionStatus, SharedStatus};
