//! # CAS Type 6 Exchange
//!
//! One request/response cycle against the scale:
//!
//! 1. write `ENQ`, read one byte, which must be `ACK`;
//! 2. write `DC1`, read the 15-byte response frame.
//!
//! Channel failures come back as link errors. A wrong ACK, or a response that
//! fails validation (including one cut short by the read timeout), comes back as
//! a protocol violation.

use crate::constants::{CAS_ACK, CAS_DC1, CAS_ENQ, CAS_FRAME_LENGTH};
use crate::error::{ProtocolViolation, ScaleError};
use crate::logging::log_frame_hex;
use crate::scale::frame::{decode_frame, ScaleFrame};
use crate::scale::serial::ScaleTransport;

/// Runs the ENQ/ACK handshake and returns the raw response to DC1, unvalidated.
pub async fn request_frame<T: ScaleTransport>(
    transport: &mut T,
) -> Result<Vec<u8>, ScaleError> {
    log::debug!("Reading data from the scales");
    transport.write(&[CAS_ENQ]).await?;
    let ack = transport.read(1).await?;
    if ack.as_slice() != [CAS_ACK] {
        return Err(ProtocolViolation::UnexpectedAck {
            received: ack.first().copied(),
        }
        .into());
    }

    transport.write(&[CAS_DC1]).await?;
    let response = transport.read(CAS_FRAME_LENGTH).await?;
    log_frame_hex("Scale response", &response);
    Ok(response)
}

/// Performs one full exchange and decodes the response.
pub async fn exchange<T: ScaleTransport>(
    transport: &mut T,
) -> Result<ScaleFrame, ScaleError> {
    let response = request_frame(transport).await?;
    log::debug!("Checking the correctness of the scales response");
    let frame = decode_frame(&response)?;
    Ok(frame)
}
