use std::{fs, path::Path};

use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod payment;

pub mod middleware {
    pub mod logger;
}

pub use payment::{PaymentLog, PaymentLogEntry};

const LOG_FILE: &str = "server.log";

/// Installs the global logger: coloured levels on stdout and a plain copy in `log_dir`.
pub fn setup(log_dir: &str) -> Result<(), fern::InitError> {
    fs::create_dir_all(log_dir).map_err(fern::InitError::Io)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let color = match record.level() {
                log::Level::Info => "green",
                log::Level::Warn => "yellow",
                log::Level::Error => "red",
                log::Level::Debug => "magenta",
                log::Level::Trace => "bright black",
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.target(),
                record.level().to_string().color(color),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("hyper_util", log::LevelFilter::Off)
        .level_for("rustls", log::LevelFilter::Off)
        .level_for("mongodb", log::LevelFilter::Warn)
        .level_for("sqlx", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(Path::new(log_dir).join(LOG_FILE))?)
        .apply()?;
    Ok(())
}

pub fn middleware(console_logging_enabled: bool) -> LoggerMiddleware {
    LoggerMiddleware::new(console_logging_enabled)
}
