use thiserror::Error;

/// The taxonomy of §7: every fallible operation in the engine returns one
/// of these. Business rejections (insufficient funds, timeout, …) are
/// *not* represented here — they travel as `status_code` strings on the
/// relevant signal, per §7's "not an error internally".
#[derive(Debug, Error)]
pub enum ShardError {
    /// Invalid inbound message or config; the caller should emit a
    /// `Rejected*` signal and drop the message. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A serialization failure or unique-violation race on account
    /// creation. The whole transaction should be retried.
    #[error("contention: {0}")]
    Contention(String),

    /// The store returned an I/O or encoding error unrelated to
    /// application-level contention.
    #[error("storage error: {0}")]
    Storage(String),

    /// A row failed to encode/decode (`bincode`/`serde_json`).
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The root-config fetch API (or another external collaborator) is
    /// unavailable. Callers fall back to a cached value or defer.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Shard-ownership mismatch or other unrecoverable condition; the
    /// process should exit non-zero and let a monitor restart it.
    #[error("fatal: {0}")]
    Fatal(String),
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("bincode: {0}")]
    Bincode(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ShardResult<T> = Result<T, ShardError>;

impl ShardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn contention(msg: impl Into<String>) -> Self {
        Self::Contention(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// True for errors §7 says to retry the whole transaction for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShardError::Contention(_))
    }
}
