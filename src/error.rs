//! # Scale Error Handling
//!
//! This module defines the [`ScaleError`] enum, which represents the different error
//! types that can occur in the cas-scale crate, and [`ProtocolViolation`], the
//! sub-kinds of an invalid scale response.
//!
//! The polling loop depends on the split between the two top-level kinds: a link
//! error means the serial channel itself is unusable and must be reopened, while a
//! protocol violation only costs the current poll cycle.

use thiserror::Error;

/// Represents the different error types that can occur in the scale crate.
#[derive(Debug, Error)]
pub enum ScaleError {
    /// The serial channel could not be opened, closed, read or written.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// The scale answered, but the response was not valid.
    #[error("Incorrect device response: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A weight was requested in a unit the crate does not know.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// A configuration value is out of range or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScaleError {
    /// Returns `true` for failures of the serial channel itself.
    pub fn is_link_error(&self) -> bool {
        matches!(self, ScaleError::SerialPortError(_))
    }

    /// Returns `true` for invalid responses received over a healthy channel.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ScaleError::Protocol(_))
    }
}

impl From<std::io::Error> for ScaleError {
    fn from(error: std::io::Error) -> Self {
        ScaleError::SerialPortError(error.to_string())
    }
}

/// The ways a scale response can fail validation or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// The reply to ENQ was not ACK. `None` means the read timed out empty.
    #[error("ACK={}, expected 0x06", fmt_ack(.received))]
    UnexpectedAck { received: Option<u8> },

    #[error("Response len={len}, expected 15")]
    InvalidLength { len: usize },

    #[error("Response wrap={}, expected 01020304", hex::encode(.found))]
    InvalidEnvelope { found: [u8; 4] },

    #[error("Computed BCC=0x{calculated:02X}, expected 0x{expected:02X}")]
    InvalidChecksum { expected: u8, calculated: u8 },

    #[error("STA=0x{0:02X} not in [0x53, 0x55, 0x46]")]
    UnknownStatus(u8),

    /// Byte 3 of the frame is not a recognised sign character.
    #[error("Invalid weight sign: 0x{0:02X}")]
    InvalidSign(u8),

    /// The weight digits could not be parsed as a decimal number.
    #[error("Invalid weight value: {0:?}")]
    InvalidWeight(String),

    #[error("UN={} not in [2067, 6b67, 6c62]", hex::encode(.0))]
    UnknownUnitCode([u8; 2]),
}

fn fmt_ack(received: &Option<u8>) -> String {
    match received {
        Some(byte) => format!("0x{byte:02X}"),
        None => "<none>".to_string(),
    }
}
