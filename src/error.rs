//! Error types for the mapping engine

use thiserror::Error;

use crate::control::ControlId;
use crate::mapping::WireKey;
use crate::midi::format_hex;

/// Why a raw buffer could not be decoded into a [`crate::midi::MidiEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("empty buffer")]
    Empty,

    /// First byte is a data byte (running status is not tracked)
    #[error("missing status byte")]
    MissingStatus,

    #[error("system message 0x{0:02X} cannot be mapped")]
    SystemMessage(u8),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("data byte {index} has the status bit set")]
    DataOutOfRange { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("malformed MIDI message [{}]: {reason}", format_hex(.bytes))]
    MalformedMessage {
        bytes: Vec<u8>,
        reason: MalformedReason,
    },

    #[error("mapping {key} targets {control}, which is not registered")]
    DanglingTarget { key: WireKey, control: ControlId },
}

impl EngineError {
    pub(crate) fn malformed(bytes: &[u8], reason: MalformedReason) -> Self {
        EngineError::MalformedMessage {
            bytes: bytes.to_vec(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
