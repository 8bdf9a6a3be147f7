//! The sink task pipeline.
//!
//! Per batch: `Ready → (normalize → dispatch → policy)* → Ready | Failed`.
//! Records are handled strictly one after another in delivery order, so a
//! partition's records reach the store in offset order.

use std::sync::Arc;

use docsink_core::{
    InboundRecord, PolicyResult, SinkError, SinkTaskConfig, StoreClient, ToleranceMode,
    TolerancePolicy, WriteMetrics, WriteMetricsSnapshot,
};
use docsink_tx::{assign_id, normalize};
use tracing::{error, info};

use crate::dispatcher::WriteDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    /// A batch aborted; no further batches are accepted.
    Failed,
}

/// Aggregate outcome of one successfully processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub written: usize,
    /// Failed writes dropped under `ToleranceMode::All`.
    pub skipped: usize,
}

pub struct SinkTask {
    config: SinkTaskConfig,
    dispatcher: WriteDispatcher,
    policy: TolerancePolicy,
    state: TaskState,
}

impl SinkTask {
    /// Connects the store client and readies the task for its first batch.
    pub async fn start(config: SinkTaskConfig, store: Box<dyn StoreClient>) -> Result<Self, SinkError> {
        let mut dispatcher = WriteDispatcher::new(config.router.clone(), store);
        dispatcher.connect().await?;
        let policy = TolerancePolicy::new(config.tolerance, Arc::new(WriteMetrics::new()));
        info!(
            task = %config.name,
            store = dispatcher.store_name(),
            tolerance = %policy.mode(),
            "sink task started"
        );
        Ok(Self {
            config,
            dispatcher,
            policy,
            state: TaskState::Ready,
        })
    }

    /// Writes a batch in order.
    ///
    /// Returns `Ok` when every record was either written or skipped by the
    /// tolerance policy; the host may then advance offsets past the batch.
    /// Any `Err` is fatal: processing stopped at the failing record and the
    /// task refuses further batches.
    pub async fn process(&mut self, batch: &[InboundRecord]) -> Result<BatchSummary, SinkError> {
        if self.state == TaskState::Failed {
            return Err(SinkError::TaskFailed);
        }
        let result = self.process_records(batch).await;
        if let Err(e) = &result {
            error!(task = %self.config.name, error = %e, "batch aborted");
            self.state = TaskState::Failed;
        }
        result
    }

    async fn process_records(&self, batch: &[InboundRecord]) -> Result<BatchSummary, SinkError> {
        let mut summary = BatchSummary::default();
        for record in batch {
            summary.records += 1;

            // Normalization and routing failures bypass the tolerance policy.
            let document = assign_id(self.config.id_strategy, record, normalize(record)?);
            let collection = self.dispatcher.resolve(&record.topic)?;

            let outcome = self.dispatcher.write(collection, &document).await;
            let written = outcome.is_success();
            match self.policy.handle(record, collection, outcome) {
                PolicyResult::Continue if written => summary.written += 1,
                PolicyResult::Continue => summary.skipped += 1,
                PolicyResult::Abort(err) => return Err(err),
            }
        }
        Ok(summary)
    }

    /// Releases the store client.
    pub async fn stop(mut self) -> Result<(), SinkError> {
        self.dispatcher.close().await?;
        info!(task = %self.config.name, metrics = ?self.metrics(), "sink task stopped");
        Ok(())
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn config(&self) -> &SinkTaskConfig {
        &self.config
    }

    /// Tolerance mode the task's policy applies to write failures.
    pub fn tolerance(&self) -> ToleranceMode {
        self.policy.mode()
    }

    pub fn metrics(&self) -> WriteMetricsSnapshot {
        self.policy.metrics().snapshot()
    }
}
