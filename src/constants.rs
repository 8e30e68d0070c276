//! CAS Type 6 Protocol Constants
//!
//! This module defines the control codes, frame layout and lookup codes used by
//! the CAS-M DC1 (CAS Type 6) request/response protocol.

/// Enquiry control code, opens an exchange
pub const CAS_ENQ: u8 = 0x05;

/// Acknowledge control code, expected in reply to ENQ
pub const CAS_ACK: u8 = 0x06;

/// Transmit request control code (DC1), asks the scale for a weight frame
pub const CAS_DC1: u8 = 0x11;

/// Total length of a response frame
pub const CAS_FRAME_LENGTH: usize = 15;

/// Envelope markers: the 2-byte prefix followed by the 2-byte suffix
pub const CAS_FRAME_WRAP: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

// ----------------------------------------------------------------------------
// Frame layout (byte offsets)
// ----------------------------------------------------------------------------

pub const CAS_PREFIX_OFFSET: usize = 0;
pub const CAS_PREFIX_LENGTH: usize = 2;
pub const CAS_STATUS_OFFSET: usize = 2;
pub const CAS_WEIGHT_OFFSET: usize = 3;
pub const CAS_WEIGHT_LENGTH: usize = 7;
pub const CAS_UNIT_OFFSET: usize = 10;
pub const CAS_UNIT_LENGTH: usize = 2;
pub const CAS_BCC_OFFSET: usize = 12;
pub const CAS_SUFFIX_OFFSET: usize = 13;
pub const CAS_SUFFIX_LENGTH: usize = 2;

/// Start of the span covered by the block check character
pub const CAS_DATA_OFFSET: usize = 2;

/// Length of the span covered by the block check character (status..unit)
pub const CAS_DATA_LENGTH: usize = 10;

// Status codes
pub const CAS_STATUS_STABLE: u8 = 0x53; // 'S'
pub const CAS_STATUS_UNSTABLE: u8 = 0x55; // 'U'
pub const CAS_STATUS_OVERLOAD: u8 = 0x46; // 'F'

// Unit codes
pub const CAS_UNIT_GRAMS: [u8; 2] = [0x20, 0x67]; // " g"
pub const CAS_UNIT_KILOGRAMS: [u8; 2] = [0x6B, 0x67]; // "kg"
pub const CAS_UNIT_POUNDS: [u8; 2] = [0x6C, 0x62]; // "lb"

// Weight sign characters
pub const CAS_SIGN_PLUS: u8 = b'+';
pub const CAS_SIGN_MINUS: u8 = b'-';
