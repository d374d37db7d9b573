//! Datagram transport to the controller.

pub mod transmitter;

pub use transmitter::{Transmitter, UdpTransmitter};
