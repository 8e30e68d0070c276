//! Startup configuration: serial parameters plus polling behaviour.
//!
//! A JSON file may supply any subset of the fields; the rest keep their defaults.
//!
//! ```json
//! {
//!   "serial": { "port": "/dev/ttyUSB0", "baudrate": 9600, "parity": "N", "timeout": 1000 },
//!   "poller": { "retry_delay": 300, "recovery_delay": 5000, "unit": "gr", "decimal_places": 1 }
//! }
//! ```

use crate::error::ScaleError;
use crate::poller::PollerConfig;
use crate::scale::serial::SerialConfig;
use crate::scale::units::MAX_DECIMAL_PLACES;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub poller: PollerConfig,
}

impl AppConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScaleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScaleError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScaleError> {
        let config: AppConfig =
            serde_json::from_str(text).map_err(|e| ScaleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScaleError> {
        self.serial.validate()?;
        if self.poller.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ScaleError::Config(format!(
                "decimal_places {} exceeds {MAX_DECIMAL_PLACES}",
                self.poller.decimal_places
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::serial::Parity;
    use crate::scale::units::WeightUnit;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_startup_constants() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baudrate, 9600);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.serial.parity, Parity::None);
        assert_eq!(config.serial.stop_bits, 1);
        assert_eq!(config.serial.timeout, Duration::from_secs(1));
        assert_eq!(config.poller.retry_delay, Duration::from_millis(300));
        assert_eq!(config.poller.recovery_delay, Duration::from_secs(5));
        assert_eq!(config.poller.unit, WeightUnit::Grams);
        assert_eq!(config.poller.decimal_places, 1);
    }

    #[test]
    fn test_partial_json() {
        let config = AppConfig::from_json(
            r#"{ "serial": { "port": "COM6", "parity": "E" }, "poller": { "unit": "kg" } }"#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "COM6");
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.baudrate, 9600);
        assert_eq!(config.poller.unit, WeightUnit::Kilograms);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "serial": { "data_bits": 9 } }"#),
            Err(ScaleError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{ "poller": { "unit": "oz" } }"#),
            Err(ScaleError::Config(_))
        ));
    }
}
