//! # CAS Type 6 Frame Codec
//!
//! This module validates and decodes the fixed-length response frame of a CAS Type 6
//! scale, and encodes such frames for simulators and tests. It knows nothing about
//! retries or the serial link; see [`crate::scale::protocol`] for the exchange itself.
//!
//! ## Frame layout
//!
//! ```text
//!  0    1    2     3      4 .. 9     10   11   12   13   14
//! +----+----+-----+------+----------+---------+----+----+----+
//! | 01 | 02 | STA | SIGN | DIGITS   | UNIT    |BCC | 03 | 04 |
//! +----+----+-----+------+----------+---------+----+----+----+
//! ```
//!
//! `BCC` is the XOR of bytes 2..12. A single-byte XOR cannot catch every corruption:
//! two flipped bits in the same position of different bytes cancel out. That is a
//! property of the device's checksum and is accepted as is.
//!
//! ## Usage
//!
//! ```ignore
//! let frame = decode_frame(&bytes)?;
//! println!("{} {} {}", frame.weight, frame.unit, frame.status);
//! ```

use crate::constants::{
    CAS_BCC_OFFSET, CAS_DATA_LENGTH, CAS_DATA_OFFSET, CAS_FRAME_LENGTH, CAS_FRAME_WRAP,
    CAS_PREFIX_LENGTH, CAS_PREFIX_OFFSET, CAS_SIGN_MINUS, CAS_SIGN_PLUS,
    CAS_STATUS_OFFSET, CAS_STATUS_OVERLOAD, CAS_STATUS_STABLE, CAS_STATUS_UNSTABLE,
    CAS_SUFFIX_LENGTH, CAS_SUFFIX_OFFSET, CAS_UNIT_LENGTH, CAS_UNIT_OFFSET, CAS_WEIGHT_LENGTH,
    CAS_WEIGHT_OFFSET,
};
use crate::error::ProtocolViolation;
use crate::scale::units::WeightUnit;
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;
use rust_decimal::Decimal;
use std::fmt;

/// Weighing status reported in the STA byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleStatus {
    Overload,
    Stable,
    Unstable,
}

impl ScaleStatus {
    pub fn from_code(code: u8) -> Result<Self, ProtocolViolation> {
        match code {
            CAS_STATUS_STABLE => Ok(ScaleStatus::Stable),
            CAS_STATUS_UNSTABLE => Ok(ScaleStatus::Unstable),
            CAS_STATUS_OVERLOAD => Ok(ScaleStatus::Overload),
            other => Err(ProtocolViolation::UnknownStatus(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ScaleStatus::Stable => CAS_STATUS_STABLE,
            ScaleStatus::Unstable => CAS_STATUS_UNSTABLE,
            ScaleStatus::Overload => CAS_STATUS_OVERLOAD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScaleStatus::Overload => "Overload",
            ScaleStatus::Stable => "Stable",
            ScaleStatus::Unstable => "Unstable",
        }
    }
}

impl fmt::Display for ScaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fully decoded response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFrame {
    pub status: ScaleStatus,
    /// Signed weight in `unit`, with the decimal scale the scale sent.
    pub weight: Decimal,
    pub unit: WeightUnit,
}

/// Field view over a 15-byte response, before any validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub prefix: &'a [u8],
    pub status: u8,
    /// Sign and digits, possibly blank padded.
    pub weight: &'a [u8],
    pub unit: [u8; 2],
    pub bcc: u8,
    pub suffix: &'a [u8],
}

impl RawFrame<'_> {
    /// Prefix and suffix markers joined, as compared against the wrap constant.
    pub fn wrap(&self) -> [u8; 4] {
        [self.prefix[0], self.prefix[1], self.suffix[0], self.suffix[1]]
    }
}

/// Uses `nom` to split a response into its fields.
pub fn split_frame(input: &[u8]) -> IResult<&[u8], RawFrame<'_>> {
    let (input, prefix) = take(CAS_PREFIX_LENGTH)(input)?;
    let (input, status) = be_u8(input)?;
    let (input, weight) = take(CAS_WEIGHT_LENGTH)(input)?;
    let (input, unit) = take(CAS_UNIT_LENGTH)(input)?;
    let (input, bcc) = be_u8(input)?;
    let (input, suffix) = take(CAS_SUFFIX_LENGTH)(input)?;
    Ok((
        input,
        RawFrame {
            prefix,
            status,
            weight,
            unit: [unit[0], unit[1]],
            bcc,
            suffix,
        },
    ))
}

/// Calculates the block check character: XOR of every byte, starting from zero.
pub fn calculate_bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |bcc, byte| bcc ^ byte)
}

/// Checks length, envelope and checksum, in that order, stopping at the first failure.
pub fn verify_frame(response: &[u8]) -> Result<RawFrame<'_>, ProtocolViolation> {
    if response.len() != CAS_FRAME_LENGTH {
        return Err(ProtocolViolation::InvalidLength {
            len: response.len(),
        });
    }
    let (_, raw) = split_frame(response).map_err(|_| ProtocolViolation::InvalidLength {
        len: response.len(),
    })?;

    let wrap = raw.wrap();
    if wrap != CAS_FRAME_WRAP {
        return Err(ProtocolViolation::InvalidEnvelope { found: wrap });
    }

    let calculated = calculate_bcc(&response[CAS_DATA_OFFSET..CAS_DATA_OFFSET + CAS_DATA_LENGTH]);
    if calculated != raw.bcc {
        return Err(ProtocolViolation::InvalidChecksum {
            expected: raw.bcc,
            calculated,
        });
    }
    Ok(raw)
}

/// Validates a response and decodes status, weight and unit.
///
/// Either every field decodes and a [`ScaleFrame`] is returned, or nothing is.
pub fn decode_frame(response: &[u8]) -> Result<ScaleFrame, ProtocolViolation> {
    let raw = verify_frame(response)?;
    let status = ScaleStatus::from_code(raw.status)?;
    let weight = parse_weight(raw.weight)?;
    let unit = WeightUnit::from_code(raw.unit)?;
    Ok(ScaleFrame {
        status,
        weight,
        unit,
    })
}

/// Parses the 7-byte weight field: an optional sign, then digits with at most one point.
///
/// Blank padding on either side is ignored, so `"   12.5"`, `"  -12.5"` and
/// `"+12.5  "` all decode. A first non-blank byte that is neither a sign, a digit
/// nor a point is reported as [`ProtocolViolation::InvalidSign`].
pub fn parse_weight(field: &[u8]) -> Result<Decimal, ProtocolViolation> {
    let invalid = || ProtocolViolation::InvalidWeight(String::from_utf8_lossy(field).into_owned());

    let start = field
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(invalid)?;
    let end = field
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    let trimmed = &field[start..end];

    let (negative, digits) = match trimmed[0] {
        CAS_SIGN_PLUS => (false, &trimmed[1..]),
        CAS_SIGN_MINUS => (true, &trimmed[1..]),
        b'0'..=b'9' | b'.' => (false, trimmed),
        other => return Err(ProtocolViolation::InvalidSign(other)),
    };

    let mut mantissa: i64 = 0;
    let mut scale: Option<u32> = None;
    let mut seen_digit = false;
    for &byte in digits {
        match byte {
            b'0'..=b'9' => {
                mantissa = mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(i64::from(byte - b'0')))
                    .ok_or_else(invalid)?;
                if let Some(s) = scale.as_mut() {
                    *s += 1;
                }
                seen_digit = true;
            }
            b'.' if scale.is_none() => scale = Some(0),
            _ => return Err(invalid()),
        }
    }
    if !seen_digit {
        return Err(invalid());
    }

    let mut weight = Decimal::try_new(mantissa, scale.unwrap_or(0)).map_err(|_| invalid())?;
    weight.set_sign_negative(negative);
    Ok(weight)
}

/// Renders a weight into the 7-byte sign + digits field, zero padded.
pub fn encode_weight(weight: Decimal) -> Result<[u8; CAS_WEIGHT_LENGTH], ProtocolViolation> {
    let sign = if weight.is_sign_negative() {
        CAS_SIGN_MINUS
    } else {
        CAS_SIGN_PLUS
    };
    let body = format!("{:0>width$}", weight.abs().to_string(), width = CAS_WEIGHT_LENGTH - 1);
    if body.len() != CAS_WEIGHT_LENGTH - 1 {
        return Err(ProtocolViolation::InvalidWeight(body));
    }

    let mut field = [0u8; CAS_WEIGHT_LENGTH];
    field[0] = sign;
    field[1..].copy_from_slice(body.as_bytes());
    Ok(field)
}

/// Builds a 15-byte frame from raw field values, computing the BCC.
///
/// No field is checked, which makes it suitable for producing malformed frames.
pub fn pack_raw_frame(
    status: u8,
    weight: &[u8; CAS_WEIGHT_LENGTH],
    unit: [u8; 2],
) -> [u8; CAS_FRAME_LENGTH] {
    let mut frame = [0u8; CAS_FRAME_LENGTH];
    frame[CAS_PREFIX_OFFSET..CAS_PREFIX_OFFSET + CAS_PREFIX_LENGTH]
        .copy_from_slice(&CAS_FRAME_WRAP[..2]);
    frame[CAS_STATUS_OFFSET] = status;
    frame[CAS_WEIGHT_OFFSET..CAS_WEIGHT_OFFSET + CAS_WEIGHT_LENGTH].copy_from_slice(weight);
    frame[CAS_UNIT_OFFSET..CAS_UNIT_OFFSET + CAS_UNIT_LENGTH].copy_from_slice(&unit);
    frame[CAS_BCC_OFFSET] =
        calculate_bcc(&frame[CAS_DATA_OFFSET..CAS_DATA_OFFSET + CAS_DATA_LENGTH]);
    frame[CAS_SUFFIX_OFFSET..CAS_SUFFIX_OFFSET + CAS_SUFFIX_LENGTH]
        .copy_from_slice(&CAS_FRAME_WRAP[2..]);
    frame
}

/// Packs a decoded frame back into its wire representation.
pub fn pack_frame(frame: &ScaleFrame) -> Result<[u8; CAS_FRAME_LENGTH], ProtocolViolation> {
    let weight = encode_weight(frame.weight)?;
    Ok(pack_raw_frame(frame.status.code(), &weight, frame.unit.code()))
}
