use thiserror::Error;

/// Failure of a single cache operation.
///
/// None of these reach the caller of the listing cache: every variant is
/// logged and the request falls back to the backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend `{backend}` failed during {op}: {message}")]
    Backend {
        backend: &'static str,
        op: &'static str,
        message: String,
    },
    #[error("cache operation {op} timed out after {timeout_ms} ms")]
    Timeout { op: &'static str, timeout_ms: u64 },
    #[error("cache payload for `{key}` could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache key `{key}` holds a value of the wrong type")]
    WrongType { key: String },
}

impl CacheError {
    pub fn backend(backend: &'static str, op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend,
            op,
            message: err.to_string(),
        }
    }

    pub fn wrong_type(key: impl Into<String>) -> Self {
        Self::WrongType { key: key.into() }
    }
}
