//! # Scale Serial Communication
//!
//! This module defines the byte channel the scale session talks through
//! ([`ScaleTransport`]), the serial parameters it is opened with ([`SerialConfig`]),
//! and the `tokio_serial` backed implementation used against real hardware.

use crate::error::ScaleError;
use serde::Deserialize;
use std::io;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::SerialPortBuilderExt;

/// Parity setting of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl FromStr for Parity {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Parity::None),
            "e" | "even" => Ok(Parity::Even),
            "o" | "odd" => Ok(Parity::Odd),
            _ => Err(ScaleError::Config(format!("unknown parity {s:?}"))),
        }
    }
}

impl TryFrom<String> for Parity {
    type Error = ScaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Serial parameters for the scale connection.
///
/// Supplied once when the session is built and reused verbatim on every reopen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Read/write timeout. A read returns whatever arrived when it expires.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            timeout: Duration::from_secs(1),
        }
    }
}

impl SerialConfig {
    pub fn new(port: &str) -> Self {
        SerialConfig {
            port: port.to_string(),
            ..SerialConfig::default()
        }
    }

    /// Checks that every value maps onto a setting the serial driver supports.
    pub fn validate(&self) -> Result<(), ScaleError> {
        self.tokio_data_bits()?;
        self.tokio_stop_bits()?;
        if self.baudrate == 0 {
            return Err(ScaleError::Config("baudrate must be non-zero".into()));
        }
        Ok(())
    }

    fn tokio_data_bits(&self) -> Result<tokio_serial::DataBits, ScaleError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(ScaleError::Config(format!("unsupported data bits {other}"))),
        }
    }

    fn tokio_stop_bits(&self) -> Result<tokio_serial::StopBits, ScaleError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(ScaleError::Config(format!("unsupported stop bits {other}"))),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Byte-oriented duplex channel to the scale.
///
/// Errors returned here are failures of the channel itself; the session reports them
/// as link errors.
#[async_trait::async_trait]
pub trait ScaleTransport: Send {
    /// Configures the channel with `config` and opens it.
    async fn open(&mut self, config: &SerialConfig) -> io::Result<()>;

    async fn close(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    async fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads up to `n` bytes. Fewer are returned when the timeout expires first.
    async fn read(&mut self, n: usize) -> io::Result<Vec<u8>>;
}

/// Transport over a real serial port, using `tokio_serial`.
pub struct SerialTransport {
    port: Option<tokio_serial::SerialStream>,
    timeout: Duration,
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport {
    pub fn new() -> Self {
        SerialTransport {
            port: None,
            timeout: SerialConfig::default().timeout,
        }
    }

    fn port_mut(&mut self) -> io::Result<&mut tokio_serial::SerialStream> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is not open"))
    }
}

#[async_trait::async_trait]
impl ScaleTransport for SerialTransport {
    async fn open(&mut self, config: &SerialConfig) -> io::Result<()> {
        let invalid = |e: ScaleError| io::Error::new(io::ErrorKind::InvalidInput, e.to_string());
        let data_bits = config.tokio_data_bits().map_err(invalid)?;
        let stop_bits = config.tokio_stop_bits().map_err(invalid)?;

        log::debug!("Opening a serial port {}", config.port);
        let port = tokio_serial::new(config.port.as_str(), config.baudrate)
            .data_bits(data_bits)
            .parity(config.parity.into())
            .stop_bits(stop_bits)
            .timeout(config.timeout)
            .open_native_async()?;

        self.port = Some(port);
        self.timeout = config.timeout;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        // SerialStream has no close method; dropping it releases the port
        if self.port.take().is_some() {
            log::debug!("Serial port closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + self.timeout;
        let port = self.port_mut()?;
        timeout_at(deadline, async {
            port.write_all(data).await?;
            port.flush().await
        })
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "serial write timed out"))?
    }

    async fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let port = self.port_mut()?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match timeout_at(deadline, port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(count)) => filled += count,
                Ok(Err(e)) => return Err(e),
                // short read on timeout
                Err(_) => break,
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
