//! # Scale Session
//!
//! [`ScaleSession`] owns the transport for its whole lifetime, keeps the last
//! committed [`ScaleReading`], and turns it into a weight in whatever unit and
//! precision the consumer asks for.

use crate::error::ScaleError;
use crate::scale::frame::{ScaleFrame, ScaleStatus};
use crate::scale::protocol::exchange;
use crate::scale::serial::{ScaleTransport, SerialConfig};
use crate::scale::units::{convert, round_05_up, WeightUnit};
use rust_decimal::Decimal;

/// The state of the last successful exchange.
///
/// Status, weight and unit always come from the same frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleReading {
    pub status: ScaleStatus,
    /// Weight in `unit`, as sent by the scale.
    pub weight: Decimal,
    pub unit: WeightUnit,
}

impl Default for ScaleReading {
    /// "Not ready": overload, zero grams.
    fn default() -> Self {
        ScaleReading {
            status: ScaleStatus::Overload,
            weight: Decimal::ZERO,
            unit: WeightUnit::Grams,
        }
    }
}

impl From<ScaleFrame> for ScaleReading {
    fn from(frame: ScaleFrame) -> Self {
        ScaleReading {
            status: frame.status,
            weight: frame.weight,
            unit: frame.unit,
        }
    }
}

impl ScaleReading {
    /// Converts the weight into `unit` and quantises it to `decimal_places`.
    pub fn weight_in(&self, unit: WeightUnit, decimal_places: u32) -> Decimal {
        round_05_up(convert(self.weight, self.unit, unit), decimal_places)
    }
}

/// A connection to one CAS Type 6 scale.
pub struct ScaleSession<T: ScaleTransport> {
    transport: T,
    config: SerialConfig,
    reading: ScaleReading,
}

impl<T: ScaleTransport> ScaleSession<T> {
    /// Creates a session; the transport is not opened until [`initialize`](Self::initialize).
    pub fn new(transport: T, config: SerialConfig) -> Self {
        ScaleSession {
            transport,
            config,
            reading: ScaleReading::default(),
        }
    }

    /// Opens the transport with the session's configuration.
    ///
    /// Returns whether the channel reports itself open. An open failure is a link
    /// error; retrying is up to the caller.
    pub async fn initialize(&mut self) -> Result<bool, ScaleError> {
        if let Err(e) = self.transport.open(&self.config).await {
            let error = ScaleError::from(e);
            log::error!("{error}");
            return Err(error);
        }
        Ok(self.transport.is_open())
    }

    /// Closes the transport if it is open and opens it again with the same configuration.
    ///
    /// Failures are logged, not returned: the next [`update`](Self::update) shows
    /// whether the link came back.
    pub async fn reinitialize(&mut self) {
        if self.transport.is_open() {
            if let Err(e) = self.transport.close().await {
                log::error!("Device initialization error. {e}");
                return;
            }
        }
        match self.transport.open(&self.config).await {
            Ok(()) => log::info!("Serial port {} reopened", self.config.port),
            Err(e) => log::error!("Device initialization error. {e}"),
        }
    }

    /// Performs one exchange with the scale and commits the decoded reading.
    ///
    /// On any error the previous reading is kept.
    pub async fn update(&mut self) -> Result<&ScaleReading, ScaleError> {
        match exchange(&mut self.transport).await {
            Ok(frame) => {
                self.reading = ScaleReading::from(frame);
                log::debug!(
                    "Committed reading: {} {} {}",
                    self.reading.weight,
                    self.reading.unit,
                    self.reading.status
                );
                Ok(&self.reading)
            }
            Err(error) => {
                log::error!("{error}");
                Err(error)
            }
        }
    }

    /// The last committed reading.
    pub fn reading(&self) -> &ScaleReading {
        &self.reading
    }

    pub fn status(&self) -> ScaleStatus {
        self.reading.status
    }

    /// The committed weight converted to `unit` and rounded to `decimal_places`.
    ///
    /// At most [`MAX_DECIMAL_PLACES`](crate::scale::units::MAX_DECIMAL_PLACES) places
    /// are kept; larger requests are capped.
    pub fn weight(&self, unit: WeightUnit, decimal_places: u32) -> Decimal {
        self.reading.weight_in(unit, decimal_places)
    }

    /// Like [`weight`](Self::weight), with the unit given by name (`gr`, `kg`, `lb`).
    pub fn weight_as(&self, unit: &str, decimal_places: u32) -> Result<Decimal, ScaleError> {
        let unit: WeightUnit = unit.parse()?;
        Ok(self.weight(unit, decimal_places))
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
