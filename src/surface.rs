//! Semantic controls of the control surface and where their LEDs live.

use crate::led::Region;
use std::fmt;

/// Number of file-selector bits on the surface
pub const SELECTOR_BITS: u8 = 8;

/// Every control the surface exposes. Each one has a trigger message and an
/// LED with three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Control {
    Play,
    Load,
    /// File-selector bit, 0 is least significant
    Bit(u8),
    VolumeDown,
    VolumeUp,
    TempoDown,
    TempoUp,
}

impl Control {
    pub const ALL: [Control; 14] = [
        Control::Play,
        Control::Load,
        Control::Bit(0),
        Control::Bit(1),
        Control::Bit(2),
        Control::Bit(3),
        Control::Bit(4),
        Control::Bit(5),
        Control::Bit(6),
        Control::Bit(7),
        Control::VolumeDown,
        Control::VolumeUp,
        Control::TempoDown,
        Control::TempoUp,
    ];

    /// Key used for this control in the configuration file.
    pub fn config_key(&self) -> String {
        match self {
            Control::Play => "play".to_string(),
            Control::Load => "load".to_string(),
            Control::Bit(bit) => format!("bit{}", bit),
            Control::VolumeDown => "volume_down".to_string(),
            Control::VolumeUp => "volume_up".to_string(),
            Control::TempoDown => "tempo_down".to_string(),
            Control::TempoUp => "tempo_up".to_string(),
        }
    }

    /// Surface region and column of this control's LED.
    pub fn led_address(&self) -> (Region, usize) {
        match *self {
            Control::Play => (Region::FileSelector, 0),
            Control::Load => (Region::FileSelector, 1),
            Control::Bit(bit) => (Region::FileSelector, 2 + usize::from(bit)),
            Control::VolumeDown => (Region::FunctionRow, 0),
            Control::VolumeUp => (Region::FunctionRow, 1),
            Control::TempoDown => (Region::FunctionRow, 2),
            Control::TempoUp => (Region::FunctionRow, 3),
        }
    }

    pub fn from_led_address(region: Region, column: usize) -> Option<Control> {
        match (region, column) {
            (Region::FileSelector, 0) => Some(Control::Play),
            (Region::FileSelector, 1) => Some(Control::Load),
            (Region::FileSelector, c) if (2..2 + usize::from(SELECTOR_BITS)).contains(&c) => {
                Some(Control::Bit((c - 2) as u8))
            }
            (Region::FunctionRow, 0) => Some(Control::VolumeDown),
            (Region::FunctionRow, 1) => Some(Control::VolumeUp),
            (Region::FunctionRow, 2) => Some(Control::TempoDown),
            (Region::FunctionRow, 3) => Some(Control::TempoUp),
            _ => None,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config_key())
    }
}
