use std::error::Error;
use std::fmt;

/// Custom error type for MIDI operations
#[derive(Debug)]
pub enum MidiError {
    /// Error when sending a MIDI message
    SendError(String),
    /// Error when receiving a MIDI message
    RecvError(String),
    /// Error when connecting to a MIDI device
    ConnectionError(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::SendError(msg) => write!(f, "MIDI send error: {}", msg),
            MidiError::RecvError(msg) => write!(f, "MIDI receive error: {}", msg),
            MidiError::ConnectionError(msg) => write!(f, "MIDI connection error: {}", msg),
        }
    }
}

impl Error for MidiError {}

impl From<midir::InitError> for MidiError {
    fn from(e: midir::InitError) -> Self {
        MidiError::ConnectionError(e.to_string())
    }
}

impl From<midir::PortInfoError> for MidiError {
    fn from(e: midir::PortInfoError) -> Self {
        MidiError::ConnectionError(e.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for MidiError {
    fn from(e: midir::ConnectError<T>) -> Self {
        MidiError::ConnectionError(e.to_string())
    }
}

impl From<midir::SendError> for MidiError {
    fn from(e: midir::SendError) -> Self {
        MidiError::SendError(e.to_string())
    }
}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// Represents a channel MIDI message that can be sent or received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On message with note number and velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off message with note number and velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Polyphonic key pressure
    Aftertouch { channel: u8, note: u8, pressure: u8 },
    /// Control Change message with controller number and value
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// Program Change message with program number
    ProgramChange { channel: u8, program: u8 },
    /// Channel pressure
    ChannelPressure { channel: u8, pressure: u8 },
    /// Pitch bend, 14-bit value centred on 0x2000
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Parses the leading bytes of a raw message. Returns `None` for system
    /// messages and truncated input.
    pub fn parse(data: &[u8]) -> Option<MidiMessage> {
        let status = *data.first()?;
        let channel = status & 0x0F;

        match status & 0xF0 {
            0x90 if data.len() >= 3 => Some(MidiMessage::NoteOn {
                channel,
                note: data[1],
                velocity: data[2],
            }),
            0x80 if data.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: data[1],
                velocity: data[2],
            }),
            0xA0 if data.len() >= 3 => Some(MidiMessage::Aftertouch {
                channel,
                note: data[1],
                pressure: data[2],
            }),
            0xB0 if data.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: data[1],
                value: data[2],
            }),
            0xC0 if data.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: data[1],
            }),
            0xD0 if data.len() >= 2 => Some(MidiMessage::ChannelPressure {
                channel,
                pressure: data[1],
            }),
            0xE0 if data.len() >= 3 => Some(MidiMessage::PitchBend {
                channel,
                value: u16::from(data[1] & 0x7F) | (u16::from(data[2] & 0x7F) << 7),
            }),
            _ => None,
        }
    }

    /// Encodes the message into a fixed buffer, returning the buffer and the
    /// number of bytes used.
    pub fn encode(&self) -> ([u8; 3], usize) {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => ([0x90 | (channel & 0x0F), note, velocity], 3),
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => ([0x80 | (channel & 0x0F), note, velocity], 3),
            MidiMessage::Aftertouch {
                channel,
                note,
                pressure,
            } => ([0xA0 | (channel & 0x0F), note, pressure], 3),
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => ([0xB0 | (channel & 0x0F), controller, value], 3),
            MidiMessage::ProgramChange { channel, program } => {
                ([0xC0 | (channel & 0x0F), program, 0], 2)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                ([0xD0 | (channel & 0x0F), pressure, 0], 2)
            }
            MidiMessage::PitchBend { channel, value } => (
                [
                    0xE0 | (channel & 0x0F),
                    (value & 0x7F) as u8,
                    ((value >> 7) & 0x7F) as u8,
                ],
                3,
            ),
        }
    }

    /// A Note On with zero velocity is a key release on most surfaces.
    pub fn is_release(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { velocity: 0, .. })
    }
}

/// Up to three bytes of an incoming message, copied out of the driver
/// callback so the block loop never touches the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    bytes: [u8; 3],
    len: usize,
}

impl RawMessage {
    pub fn new(data: &[u8]) -> Self {
        let len = data.len().min(3);
        let mut bytes = [0; 3];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Destination for outbound bytes of the current audio block.
///
/// Messages written in the same block keep their write order.
pub trait MidiSink {
    /// Writes one 1-3 byte message `offset` frames into the block.
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()>;
}

/// Sink for streams that have no configured port.
#[derive(Debug, Default)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        assert_eq!(
            MidiMessage::parse(&[0x91, 60, 100]),
            Some(MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_parse_rejects_system_and_truncated() {
        assert_eq!(MidiMessage::parse(&[0xF8]), None);
        assert_eq!(MidiMessage::parse(&[0x90, 60]), None);
        assert_eq!(MidiMessage::parse(&[]), None);
    }

    #[test]
    fn test_encode_program_change_uses_two_bytes() {
        let (bytes, len) = MidiMessage::ProgramChange {
            channel: 3,
            program: 42,
        }
        .encode();
        assert_eq!(&bytes[..len], &[0xC3, 42]);
    }

    #[test]
    fn test_pitch_bend_splits_into_seven_bit_halves() {
        let (bytes, len) = MidiMessage::PitchBend {
            channel: 0,
            value: 0x2000,
        }
        .encode();
        assert_eq!(&bytes[..len], &[0xE0, 0x00, 0x40]);
    }

    #[test]
    fn test_release_detection() {
        assert!(MidiMessage::parse(&[0x90, 36, 0]).unwrap().is_release());
        assert!(!MidiMessage::parse(&[0x80, 36, 64]).unwrap().is_release());
        assert!(!MidiMessage::parse(&[0x90, 36, 127]).unwrap().is_release());
    }

    #[test]
    fn test_raw_message_truncates_to_three_bytes() {
        let raw = RawMessage::new(&[0xF0, 1, 2, 3, 0xF7]);
        assert_eq!(raw.as_bytes(), &[0xF0, 1, 2]);
        assert_eq!(RawMessage::new(&[0xF8]).as_bytes(), &[0xF8]);
    }

    #[test]
    fn test_midi_error_display() {
        let err = MidiError::ConnectionError("port gone".to_string());
        assert_eq!(err.to_string(), "MIDI connection error: port gone");
    }
}
