use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format '{0}' (expected: text|json|journald)")]
    InvalidFormat(String),
    #[error("invalid log filter '{0}'")]
    InvalidLogLevel(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("journald socket unavailable: {0}")]
    Journald(String),
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
}
