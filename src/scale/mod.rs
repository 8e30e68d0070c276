//! The scale module contains the components responsible for the CAS Type 6 protocol:
//! frame validation and decoding, the request exchange, the serial transport, and the
//! session that holds the last reading.

pub mod frame;
pub mod protocol;
pub mod serial;
pub mod serial_mock;
pub mod session;
pub mod units;

pub use frame::{decode_frame, pack_frame, ScaleFrame, ScaleStatus};
pub use serial::{Parity, ScaleTransport, SerialConfig, SerialTransport};
pub use session::{ScaleReading, ScaleSession};
pub use units::WeightUnit;
