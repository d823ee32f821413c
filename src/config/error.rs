use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_log::log::SetLoggerError;

pub type Result<T> = std::result::Result<T, ErrorConfig>;

#[derive(Error, Debug)]
pub enum ErrorConfig {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_jsonc::Error),

    #[error(transparent)]
    TracingLog(#[from] SetLoggerError),

    #[error(transparent)]
    Subscriber(#[from] SetGlobalDefaultError),
}
