use anyhow::Context;
use cas_scale::{
    init_logger, log_info, AppConfig, Parity, Poller, ScaleSession, SerialTransport, WeightReport,
    WeightUnit,
};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cas-scale")]
#[command(about = "Poll a CAS Type 6 scale and show its weight")]
struct Cli {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Serial port, e.g. /dev/ttyUSB0 or COM6
    #[arg(short, long)]
    port: Option<String>,
    #[arg(short, long)]
    baudrate: Option<u32>,
    #[arg(long)]
    data_bits: Option<u8>,
    /// N, E or O
    #[arg(long)]
    parity: Option<Parity>,
    #[arg(long)]
    stop_bits: Option<u8>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Delay between polls
    #[arg(long)]
    retry_ms: Option<u64>,
    /// Delay before reopening the port after a serial error
    #[arg(long)]
    recovery_ms: Option<u64>,
    /// gr, kg or lb
    #[arg(short, long)]
    unit: Option<WeightUnit>,
    #[arg(short, long)]
    decimals: Option<u32>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(port) = self.port {
            config.serial.port = port;
        }
        if let Some(baudrate) = self.baudrate {
            config.serial.baudrate = baudrate;
        }
        if let Some(data_bits) = self.data_bits {
            config.serial.data_bits = data_bits;
        }
        if let Some(parity) = self.parity {
            config.serial.parity = parity;
        }
        if let Some(stop_bits) = self.stop_bits {
            config.serial.stop_bits = stop_bits;
        }
        if let Some(ms) = self.timeout_ms {
            config.serial.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_ms {
            config.poller.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.recovery_ms {
            config.poller.recovery_delay = Duration::from_millis(ms);
        }
        if let Some(unit) = self.unit {
            config.poller.unit = unit;
        }
        if let Some(decimals) = self.decimals {
            config.poller.decimal_places = decimals;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn show(report: &WeightReport) {
    let mut out = std::io::stdout().lock();
    // blank the previous line, then draw over it
    let _ = write!(out, "{:20}\r{report}", "");
    let _ = out.flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let config = Cli::parse().into_config()?;
    let session = ScaleSession::new(SerialTransport::new(), config.serial);
    let mut poller = Poller::new(session, config.poller);

    tokio::select! {
        _ = async {
            poller.connect().await;
            print!("\x1b[36m\x1b[40m\x1b[1m");
            poller.run(show).await;
        } => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    println!("\x1b[0m");
    let stats = poller.stats();
    log_info(&format!(
        "Stopped after {} readings, {} skipped cycles, {} link recoveries",
        stats.readings, stats.skipped, stats.recoveries
    ));
    Ok(())
}
