//! # cas-scale - A Rust Crate for CAS Type 6 Digital Scales
//!
//! The cas-scale crate polls a digital scale speaking the CAS-M DC1 (CAS Type 6)
//! protocol over a serial link, decodes each response into a weight reading with unit
//! and stability status, and keeps the link alive across transient failures.
//!
//! ## Features
//!
//! - ENQ/ACK, DC1/frame request exchange over any [`ScaleTransport`]
//! - Length, envelope and XOR checksum validation of the 15-byte response frame
//! - Status, signed weight and unit decoding, committed atomically
//! - Unit conversion (grams, kilograms, pounds) with "round 05 up" quantisation
//! - A polling loop that skips cycles on bad responses and reopens the port on link errors
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cas_scale::{ScaleSession, SerialConfig, SerialTransport, WeightUnit};
//!
//! # async fn demo() -> Result<(), cas_scale::ScaleError> {
//! let mut session = ScaleSession::new(SerialTransport::new(), SerialConfig::new("/dev/ttyUSB0"));
//! session.initialize().await?;
//! session.update().await?;
//! println!("{} g {}", session.weight(WeightUnit::Grams, 1), session.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod poller;
pub mod scale;

pub use crate::config::AppConfig;
pub use crate::error::{ProtocolViolation, ScaleError};
pub use crate::logging::{init_logger, log_info};

pub use poller::{LinkState, PollOutcome, PollStats, Poller, PollerConfig, WeightReport};
pub use scale::{
    decode_frame, pack_frame, Parity, ScaleFrame, ScaleReading, ScaleSession, ScaleStatus,
    ScaleTransport, SerialConfig, SerialTransport, WeightUnit,
};

/// Opens a session on a real serial port.
///
/// # Returns
/// * `Ok(ScaleSession)` - Session with the port open
/// * `Err(ScaleError)` - The port could not be opened
pub async fn connect(config: SerialConfig) -> Result<ScaleSession<SerialTransport>, ScaleError> {
    let mut session = ScaleSession::new(SerialTransport::new(), config);
    session.initialize().await?;
    Ok(session)
}
