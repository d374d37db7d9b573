//! Audio-reactive LED telemetry.
//!
//! Captures system loopback or microphone audio, reduces each block to a
//! loudness value and three band energies, and streams them as tiny UDP
//! frames to an LED controller found via mDNS.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod console;
pub mod discovery;
pub mod net;
pub mod pipeline;
pub mod protocol;
