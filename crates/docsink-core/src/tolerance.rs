//! Write-failure tolerance.
//!
//! The policy only ever sees store write outcomes. Serialization and routing
//! failures happen before a write is attempted and are fatal regardless of
//! [`ToleranceMode`]; they never reach [`TolerancePolicy::handle`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{error, warn};

use crate::config::ToleranceMode;
use crate::error::{SinkError, StoreError};
use crate::record::InboundRecord;

/// Result of one upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Failed(StoreError),
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            WriteOutcome::Written => None,
            WriteOutcome::Failed(e) => Some(e),
        }
    }
}

impl From<Result<(), StoreError>> for WriteOutcome {
    fn from(result: Result<(), StoreError>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Written,
            Err(e) => WriteOutcome::Failed(e),
        }
    }
}

/// Decision taken for one record.
#[derive(Debug)]
pub enum PolicyResult {
    Continue,
    /// Stop the batch and surface the error to the host runtime.
    Abort(SinkError),
}

impl PolicyResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, PolicyResult::Continue)
    }
}

/// Per-task write counters, updated from the pipeline and readable at any time.
#[derive(Debug, Default)]
pub struct WriteMetrics {
    /// Documents upserted successfully.
    pub written_total: AtomicU64,
    /// Failed writes dropped under [`ToleranceMode::All`].
    pub skipped_total: AtomicU64,
    /// Failed writes that aborted a batch.
    pub failed_total: AtomicU64,
    /// Epoch millis of the last failed write. 0 = no failures.
    pub last_error_ms: AtomicU64,
}

impl WriteMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn record_error(&self) {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_error_ms.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriteMetricsSnapshot {
        WriteMetricsSnapshot {
            written_total: self.written_total.load(Ordering::Relaxed),
            skipped_total: self.skipped_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            last_error_ms: self.last_error_ms.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WriteMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteMetricsSnapshot {
    pub written_total: u64,
    pub skipped_total: u64,
    pub failed_total: u64,
    pub last_error_ms: u64,
}

/// Decides whether a failed write stops the task.
pub struct TolerancePolicy {
    mode: ToleranceMode,
    metrics: Arc<WriteMetrics>,
}

impl TolerancePolicy {
    pub fn new(mode: ToleranceMode, metrics: Arc<WriteMetrics>) -> Self {
        Self { mode, metrics }
    }

    /// Consulted exactly once per written record.
    ///
    /// Under `All` a failure is logged and counted, then skipped. Under
    /// `None` it becomes [`SinkError::Write`].
    pub fn handle(&self, record: &InboundRecord, collection: &str, outcome: WriteOutcome) -> PolicyResult {
        let err = match outcome {
            WriteOutcome::Written => {
                self.metrics.written_total.fetch_add(1, Ordering::Relaxed);
                return PolicyResult::Continue;
            }
            WriteOutcome::Failed(err) => err,
        };
        self.metrics.record_error();

        match self.mode {
            ToleranceMode::All => {
                self.metrics.skipped_total.fetch_add(1, Ordering::Relaxed);
                warn!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    collection,
                    error = %err,
                    "write failed, skipping record (tolerance=all)"
                );
                PolicyResult::Continue
            }
            ToleranceMode::None => {
                self.metrics.failed_total.fetch_add(1, Ordering::Relaxed);
                error!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    collection,
                    error = %err,
                    "write failed, aborting batch (tolerance=none)"
                );
                PolicyResult::Abort(SinkError::Write {
                    topic: record.topic.clone(),
                    partition: record.partition,
                    offset: record.offset,
                    collection: collection.to_string(),
                    source: err,
                })
            }
        }
    }

    pub fn mode(&self) -> ToleranceMode {
        self.mode
    }

    pub fn metrics(&self) -> &Arc<WriteMetrics> {
        &self.metrics
    }
}
