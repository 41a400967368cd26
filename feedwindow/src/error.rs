use alloc::string::String;

/// A page request failed. Always recoverable: the store records the message and a later
/// admitted fetch retries the same page.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("page {page} timed out after {after_ms}ms")]
    Timeout { page: u32, after_ms: u64 },
    #[error("page {page} failed with status {status}")]
    Status { page: u32, status: u16 },
    /// The awaiting side gave up before the source answered.
    #[error("page {page} fetch was cancelled")]
    Cancelled { page: u32 },
}

/// An analytics event could not be delivered. Never surfaced past the emitter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("event sink is closed")]
    Closed,
    #[error("event sink rejected event: {0}")]
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("item extent must be non-zero")]
    ZeroItemExtent,
    #[error("page size must be non-zero")]
    ZeroPageSize,
    #[error("page ceiling must be at least 1")]
    ZeroPageCeiling,
    #[error("visibility threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),
}
