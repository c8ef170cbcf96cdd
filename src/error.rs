use thiserror::Error;

/// Errors raised inside a trading session.
///
/// Only `WindowTimeout` is expected during normal operation; it is retried by
/// the caller with a shortened backoff. Everything else ends the current
/// cycle iteration and is handled at the orchestrator boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("timed out waiting for {what}")]
    WindowTimeout { what: String },

    #[error("connection to game bridge closed")]
    Disconnected,

    #[error("bridge error: {0}")]
    Bridge(String),

    #[error("failed to decode bridge message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn window_timeout(what: impl Into<String>) -> Self {
        Self::WindowTimeout { what: what.into() }
    }

    /// Transient UI errors are retried in place instead of being escalated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::WindowTimeout { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
