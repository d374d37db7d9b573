//! Frame encoding.

use super::{Color, EffectSelection, FrameParams};
use crate::analysis::SpectrumBands;

/// The explicit "all LEDs off" payload.  Its length (4) sets it apart from
/// every steady-state frame.
pub const SHUTDOWN_FRAME: [u8; 4] = [0, 0, 0, 0];

// ---------------------------------------------------------------------------
// CommandId
// ---------------------------------------------------------------------------

/// A discrete console command (0 = off … 9 = BPM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandId(u8);

impl CommandId {
    pub const MAX: u8 = 9;

    /// Names shown in the console menu, indexed by id.
    pub const NAMES: [&'static str; 10] = [
        "Off",
        "Red",
        "Green",
        "Blue",
        "Rainbow",
        "Rainbow with glitter",
        "Confetti",
        "Sinelon",
        "Juggle",
        "BPM",
    ];

    pub fn new(id: u8) -> Option<Self> {
        (id <= Self::MAX).then_some(Self(id))
    }

    /// Parse a single typed digit.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() != 1 {
            return None;
        }
        input.parse::<u8>().ok().and_then(Self::new)
    }

    pub fn id(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }
}

// ---------------------------------------------------------------------------
// OutputFrame
// ---------------------------------------------------------------------------

/// One UDP payload, built fresh per tick and consumed by the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFrame {
    /// Loopback variant: bands plus effect id.
    Computer {
        bands: SpectrumBands,
        effect: EffectSelection,
    },
    /// Microphone variant: bands plus LED color.
    Mic { bands: SpectrumBands, color: Color },
    /// All LEDs off.
    Shutdown,
    /// Discrete console command.
    Command(CommandId),
}

impl OutputFrame {
    /// Serialise to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            OutputFrame::Computer { bands, effect } => {
                vec![bands.volume, bands.low, bands.mid, bands.high, effect.id()]
            }
            OutputFrame::Mic { bands, color } => vec![
                bands.volume,
                bands.low,
                bands.mid,
                bands.high,
                color.red,
                color.green,
                color.blue,
            ],
            OutputFrame::Shutdown => SHUTDOWN_FRAME.to_vec(),
            OutputFrame::Command(cmd) => vec![cmd.id()],
        }
    }

    /// Payload length in bytes.
    pub fn wire_len(&self) -> usize {
        match self {
            OutputFrame::Computer { .. } => 5,
            OutputFrame::Mic { .. } => 7,
            OutputFrame::Shutdown => SHUTDOWN_FRAME.len(),
            OutputFrame::Command(_) => 1,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, OutputFrame::Shutdown)
    }
}

/// Build the steady-state frame for `bands` and the current parameter.
pub fn encode(bands: SpectrumBands, params: FrameParams) -> OutputFrame {
    match params {
        FrameParams::Effect(effect) => OutputFrame::Computer { bands, effect },
        FrameParams::Color(color) => OutputFrame::Mic { bands, color },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> SpectrumBands {
        SpectrumBands::new(10, 20, 30, 40)
    }

    #[test]
    fn computer_frame_bytes() {
        let frame = encode(bands(), EffectSelection::Waves.into());
        assert_eq!(frame.to_bytes(), vec![10, 20, 30, 40, 2]);
        assert_eq!(frame.wire_len(), 5);
    }

    #[test]
    fn mic_frame_bytes() {
        let frame = encode(bands(), Color::new(5, 6, 7).into());
        assert_eq!(frame.to_bytes(), vec![10, 20, 30, 40, 5, 6, 7]);
        assert_eq!(frame.wire_len(), 7);
    }

    #[test]
    fn shutdown_frame_is_four_zero_bytes() {
        assert_eq!(OutputFrame::Shutdown.to_bytes(), vec![0, 0, 0, 0]);
        assert!(OutputFrame::Shutdown.is_shutdown());
    }

    /// Silence in the computer variant is still five bytes long.
    #[test]
    fn silent_steady_state_frames_differ_from_shutdown_by_length() {
        let silent = encode(SpectrumBands::SILENT, EffectSelection::Lofi.into());
        assert_eq!(silent.to_bytes(), vec![0, 0, 0, 0, 0]);
        assert_ne!(silent.wire_len(), OutputFrame::Shutdown.wire_len());
        assert!(!silent.is_shutdown());
    }

    #[test]
    fn to_bytes_length_matches_wire_len() {
        let frames = [
            encode(bands(), EffectSelection::Lofi2.into()),
            encode(bands(), Color::default().into()),
            OutputFrame::Shutdown,
            OutputFrame::Command(CommandId::new(7).unwrap()),
        ];
        for frame in frames {
            assert_eq!(frame.to_bytes().len(), frame.wire_len());
        }
    }

    #[test]
    fn command_ids() {
        assert_eq!(CommandId::parse("0").map(CommandId::id), Some(0));
        assert_eq!(CommandId::parse(" 9 ").map(CommandId::id), Some(9));
        assert_eq!(CommandId::parse("10"), None);
        assert_eq!(CommandId::parse("q"), None);
        assert_eq!(CommandId::parse(""), None);
        assert_eq!(CommandId::new(4).map(CommandId::name), Some("Rainbow"));
        assert_eq!(
            OutputFrame::Command(CommandId::new(3).unwrap()).to_bytes(),
            vec![3]
        );
    }
}
