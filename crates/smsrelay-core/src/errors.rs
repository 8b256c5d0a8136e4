use std::{path::PathBuf, time::Duration};

/// Core error type.
///
/// The Telegram adapter maps its specific errors into this type so the relay
/// core can handle failures consistently (fatal vs retryable vs per-unit).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The durable state file exists but cannot be parsed. Distinct from an
    /// absent file (cold start): this must abort startup, never reset state.
    #[error("state file {} is corrupt: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The remote side asked us to back off for the given duration.
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
