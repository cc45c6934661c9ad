use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::try_init();
}

/// Initializes the logger with a default filter, still overridable by `RUST_LOG`.
///
/// The bridge uses this so that `--trace` shows diagnostic readings without
/// the user also having to set `RUST_LOG`.
pub fn init_logger_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
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

/// Logs a diagnostic message: at info when tracing is on, otherwise at debug.
pub fn log_trace(trace: bool, message: &str) {
    if trace {
        log_info(message);
    } else {
        log_debug(message);
    }
}
