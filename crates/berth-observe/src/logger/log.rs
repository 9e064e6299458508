use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::time::OffsetTime, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

pub struct Logger;

impl Logger {
    /// Human-readable lines on stderr.
    pub fn text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(timer())
            .with_writer(std::io::stderr);
        install(cfg.level.filter()?, layer)
    }

    /// One JSON object per event on stderr.
    pub fn json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(timer())
            .with_writer(std::io::stderr);
        install(cfg.level.filter()?, layer)
    }

    pub fn journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        install(cfg.level.filter()?, journald_layer()?)
    }
}

fn install<L>(filter: EnvFilter, layer: L) -> Result<(), LoggerError>
where
    L: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry().with(layer).with(filter);
    try_install(subscriber)
}

fn try_install<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let msg = e.to_string();
        if msg.contains("already") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::InitializationFailed(msg)
        }
    })
}

/// RFC 3339 timestamps in the local offset, UTC when the offset cannot be determined.
fn timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<tracing_journald::Layer, LoggerError> {
    tracing_journald::layer().map_err(|e| LoggerError::Journald(e.to_string()))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<fmt::Layer<tracing_subscriber::Registry>, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
