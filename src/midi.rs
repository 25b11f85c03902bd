//! MIDI wire messages
//!
//! Decodes raw channel-voice bytes into [`MidiEvent`]s. The channel stays
//! embedded in the status byte; nothing here normalizes it.

use std::fmt;

use crate::error::{EngineError, MalformedReason, Result};
use crate::mapping::WireKey;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;

/// Channel-voice message types, selected by the status high nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MessageKind {
    /// Message type for a status byte, `None` for data bytes and system messages
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            NOTE_OFF => Some(MessageKind::NoteOff),
            NOTE_ON => Some(MessageKind::NoteOn),
            POLY_PRESSURE => Some(MessageKind::PolyPressure),
            CONTROL_CHANGE => Some(MessageKind::ControlChange),
            PROGRAM_CHANGE => Some(MessageKind::ProgramChange),
            CHANNEL_PRESSURE => Some(MessageKind::ChannelPressure),
            PITCH_BEND => Some(MessageKind::PitchBend),
            _ => None,
        }
    }

    /// Total wire length including the status byte
    pub fn message_len(self) -> usize {
        match self {
            MessageKind::ProgramChange | MessageKind::ChannelPressure => 2,
            _ => 3,
        }
    }
}

/// A decoded channel-voice message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiEvent {
    pub status: u8,
    pub data1: u8,
    /// Value byte; 0 for two-byte messages
    pub data2: u8,
}

impl MidiEvent {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Decode a raw 2 or 3 byte buffer.
    ///
    /// The buffer length must match the length implied by the status byte
    /// exactly. Running status and system messages are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&status) = bytes.first() else {
            return Err(EngineError::malformed(bytes, MalformedReason::Empty));
        };

        if status < 0x80 {
            return Err(EngineError::malformed(bytes, MalformedReason::MissingStatus));
        }

        let kind = MessageKind::from_status(status).ok_or_else(|| {
            EngineError::malformed(bytes, MalformedReason::SystemMessage(status))
        })?;

        let expected = kind.message_len();
        if bytes.len() != expected {
            return Err(EngineError::malformed(
                bytes,
                MalformedReason::Length {
                    expected,
                    actual: bytes.len(),
                },
            ));
        }

        if let Some(index) = bytes[1..].iter().position(|b| b & 0x80 != 0) {
            return Err(EngineError::malformed(
                bytes,
                MalformedReason::DataOutOfRange { index: index + 1 },
            ));
        }

        Ok(Self {
            status,
            data1: bytes[1],
            data2: bytes.get(2).copied().unwrap_or(0),
        })
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_status(self.status)
    }

    /// Channel 0-15
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// Lookup key for the mapping table
    pub fn key(&self) -> WireKey {
        WireKey::new(self.status, self.data1)
    }

    pub fn encode(&self) -> Vec<u8> {
        match self.kind() {
            Some(kind) if kind.message_len() == 2 => vec![self.status, self.data1],
            _ => vec![self.status, self.data1, self.data2],
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel() + 1;
        match self.kind() {
            Some(MessageKind::NoteOff) => {
                write!(f, "NoteOff ch:{} n:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::NoteOn) => {
                write!(f, "NoteOn ch:{} n:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::PolyPressure) => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::ControlChange) => {
                write!(f, "CC ch:{} cc:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::ProgramChange) => write!(f, "ProgramChange ch:{} p:{}", ch, self.data1),
            Some(MessageKind::ChannelPressure) => {
                write!(f, "ChannelPressure ch:{} p:{}", ch, self.data1)
            }
            Some(MessageKind::PitchBend) => {
                let value = ((self.data2 as u16) << 7) | self.data1 as u16;
                write!(f, "PitchBend ch:{} v:{}", ch, value)
            }
            None => write!(f, "{}", format_hex(&self.encode())),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
