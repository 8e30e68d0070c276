use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// The filter comes from `RUST_LOG`; without it only `info` and above are shown.
/// Calling it more than once is harmless.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// Logs a raw frame as hex at debug level.
pub fn log_frame_hex(label: &str, frame: &[u8]) {
    if log_enabled!(Level::Debug) {
        debug!("{label} ({} bytes): {}", frame.len(), hex::encode(frame));
    }
}
