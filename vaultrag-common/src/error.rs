use thiserror::Error;

/// Exhaustive error surface for the hybrid retrieval engine.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("usage error: {0}")]
    UsageError(String),

    #[error("store I/O error: {0}")]
    StoreIOError(String),

    #[error("store schema error: {0}")]
    StoreSchemaError(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("external module error: {0}")]
    ExternalModuleError(String),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Transient store failures are worth retrying once on read.
    pub fn is_transient_io(&self) -> bool {
        matches!(self, AppError::StoreIOError(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
