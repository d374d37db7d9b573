//! Wire protocol spoken to the LED controller.
//!
//! Every payload is a handful of unsigned bytes with no header, padding or
//! length prefix; the datagram length identifies the frame kind.
//!
//! | Frame    | Len | Bytes                                      |
//! |----------|-----|--------------------------------------------|
//! | Computer | 5   | volume, low, mid, high, effect id (0-4)    |
//! | Mic      | 7   | volume, low, mid, high, red, green, blue   |
//! | Shutdown | 4   | 0, 0, 0, 0                                 |
//! | Command  | 1   | command id (0-9)                           |

pub mod frame;
pub mod params;

pub use frame::{encode, CommandId, OutputFrame, SHUTDOWN_FRAME};
pub use params::{Color, EffectSelection, FrameParams};
