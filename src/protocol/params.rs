//! Externally supplied frame parameters: the effect or the LED color.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EffectSelection
// ---------------------------------------------------------------------------

/// Effect the controller renders in the computer variant.
///
/// The discriminant is the byte sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EffectSelection {
    #[default]
    Lofi = 0,
    Speed = 1,
    Waves = 2,
    WavesOutside = 3,
    Lofi2 = 4,
}

impl EffectSelection {
    pub const ALL: [EffectSelection; 5] = [
        EffectSelection::Lofi,
        EffectSelection::Lofi2,
        EffectSelection::Speed,
        EffectSelection::Waves,
        EffectSelection::WavesOutside,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Lofi),
            1 => Some(Self::Speed),
            2 => Some(Self::Waves),
            3 => Some(Self::WavesOutside),
            4 => Some(Self::Lofi2),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lofi => "LoFi",
            Self::Lofi2 => "LoFi 2",
            Self::Speed => "Speed",
            Self::Waves => "Waves",
            Self::WavesOutside => "Waves outside",
        }
    }
}

impl FromStr for EffectSelection {
    type Err = String;

    /// Accepts config-style names (`waves_outside`) or the numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "lofi" => Ok(Self::Lofi),
            "lofi2" | "lofi_2" => Ok(Self::Lofi2),
            "speed" => Ok(Self::Speed),
            "waves" => Ok(Self::Waves),
            "waves_outside" => Ok(Self::WavesOutside),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Self::from_id)
                .ok_or_else(|| format!("unknown effect \"{s}\"")),
        }
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// LED color sent with every mic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(100, 0, 255)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `r,g,b` or `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(format!("invalid hex color \"{s}\""));
            }
            let byte = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| format!("invalid hex color \"{s}\""))
            };
            return Ok(Self::new(byte(0)?, byte(2)?, byte(4)?));
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected r,g,b but got \"{s}\""));
        }
        let channel = |p: &str| {
            p.parse::<u8>()
                .map_err(|_| format!("color channel \"{p}\" is not 0-255"))
        };
        Ok(Self::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}

// ---------------------------------------------------------------------------
// FrameParams
// ---------------------------------------------------------------------------

/// The per-tick external parameter; its kind selects the frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameParams {
    Effect(EffectSelection),
    Color(Color),
}

impl From<EffectSelection> for FrameParams {
    fn from(effect: EffectSelection) -> Self {
        Self::Effect(effect)
    }
}

impl From<Color> for FrameParams {
    fn from(color: Color) -> Self {
        Self::Color(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_wire_ids() {
        assert_eq!(EffectSelection::Lofi.id(), 0);
        assert_eq!(EffectSelection::Speed.id(), 1);
        assert_eq!(EffectSelection::Waves.id(), 2);
        assert_eq!(EffectSelection::WavesOutside.id(), 3);
        assert_eq!(EffectSelection::Lofi2.id(), 4);
        for effect in EffectSelection::ALL {
            assert_eq!(EffectSelection::from_id(effect.id()), Some(effect));
        }
        assert_eq!(EffectSelection::from_id(5), None);
    }

    #[test]
    fn effect_parses_names_and_ids() {
        assert_eq!("waves-outside".parse(), Ok(EffectSelection::WavesOutside));
        assert_eq!("LoFi 2".parse(), Ok(EffectSelection::Lofi2));
        assert_eq!("2".parse(), Ok(EffectSelection::Waves));
        assert!("disco".parse::<EffectSelection>().is_err());
        assert!("9".parse::<EffectSelection>().is_err());
    }

    #[test]
    fn default_effect_is_lofi() {
        assert_eq!(EffectSelection::default(), EffectSelection::Lofi);
    }

    #[test]
    fn color_parses_both_notations() {
        assert_eq!("5, 6, 7".parse(), Ok(Color::new(5, 6, 7)));
        assert_eq!("#6400ff".parse(), Ok(Color::new(100, 0, 255)));
        assert!("256,0,0".parse::<Color>().is_err());
        assert!("1,2".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn color_display_is_hex() {
        assert_eq!(Color::default().to_string(), "#6400ff");
    }
}
