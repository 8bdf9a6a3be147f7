//! Error taxonomy for sink tasks.

/// Failure reported by a document store client.
///
/// The pipeline treats every variant the same way ("write failed"); the
/// variant only shapes the message surfaced to operators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store rejected the request as malformed (e.g. not a document, no id).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    /// Network or backend failure that may succeed on a later attempt.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The client is not connected or has been closed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by a sink task to its host runtime.
///
/// Every variant returned from a task's `process` call is fatal for the
/// current batch; whether a write failure gets that far is decided by the
/// tolerance policy.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The record's payload cannot be read under its declared schema kind.
    ///
    /// Never subject to tolerance: raised before any write is attempted.
    #[error("cannot serialize record {topic}[{partition}]@{offset}: {reason}")]
    Serialization {
        topic: String,
        partition: i32,
        offset: i64,
        reason: String,
    },

    /// The store failed to execute an upsert.
    #[error("write of record {topic}[{partition}]@{offset} to collection '{collection}' failed: {source}")]
    Write {
        topic: String,
        partition: i32,
        offset: i64,
        collection: String,
        #[source]
        source: StoreError,
    },

    /// No collection is configured for the topic and there is no default.
    #[error("no collection configured for topic '{topic}' and no default collection")]
    Routing { topic: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Store client lifecycle failure (connect / close).
    #[error("store client error: {0}")]
    Store(#[from] StoreError),

    /// A previous batch aborted; the task must be restarted.
    #[error("sink task has failed and must be restarted")]
    TaskFailed,
}

impl SinkError {
    /// Returns true for errors raised before a write was attempted.
    pub fn is_serialization(&self) -> bool {
        matches!(self, SinkError::Serialization { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self, SinkError::Write { .. })
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_to_lifecycle_error() {
        let err: SinkError = StoreError::Unavailable("bucket gone".into()).into();
        assert!(matches!(err, SinkError::Store(StoreError::Unavailable(_))));
        assert!(!err.is_write());
        assert!(!err.is_serialization());
        assert_eq!(err.to_string(), "store client error: store unavailable: bucket gone");
    }
}
