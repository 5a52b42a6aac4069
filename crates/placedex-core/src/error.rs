// crates/placedex-core/src/error.rs
use thiserror::Error;

/// Everything that can go wrong while harvesting, storing or querying places.
///
/// Two classes never surface here: the upstream's temporary per-second
/// throttle (retried inside [`crate::client::RateLimitedClient`]) and dangling
/// index references (filtered at read time by the autocomplete engine).
#[derive(Debug, Error)]
pub enum PlaceError {
    /// The upstream daily quota is used up. Terminal for the request that hit it.
    #[error("upstream daily quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The configured ceiling on per-second throttle retries was reached.
    #[error("rate-limit retries exhausted after {0} retries")]
    RetriesExhausted(u32),

    #[cfg(feature = "http")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream answered, but not in a shape we understand.
    #[error("invalid upstream data: {0}")]
    InvalidData(String),

    #[error("store unavailable: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl PlaceError {
    /// `true` for the daily-quota signal, which must never be retried.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, PlaceError::QuotaExhausted(_))
    }
}

pub type Result<T> = std::result::Result<T, PlaceError>;
