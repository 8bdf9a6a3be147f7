//! # DocSink I/O - Task Pipeline, Stores and Kafka Runtime
//!
//! This crate wires DocSink together: the [`SinkTask`] pipeline that turns
//! batches of inbound records into document upserts, the store clients it
//! writes through, and the Kafka consumer loop that feeds it.
//!
//! ## Features
//!
//! ### Pipeline
//! - **Sink Task**: ordered per-record normalize → dispatch → tolerance policy
//! - **Write Dispatcher**: topic routing and single-shot upserts
//!
//! ### Document Stores
//! - **Object Store**: documents as JSON objects in memory, a local directory or S3
//! - **Stdout**: dry runs and debugging output
//!
//! ### Host Runtime
//! - **Kafka**: batched consumption with offsets committed only after a batch succeeds
//!
//! ## Example Usage
//!
//! ```rust
//! use docsink_core::{CollectionRouter, InboundRecord, InboundValue, SchemaKind, SinkTaskConfig, ToleranceMode};
//! use docsink_io::{store_object::ObjectDocumentStore, SinkTask};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SinkTaskConfig::new("orders", CollectionRouter::with_default("docs"), ToleranceMode::None);
//! let mut task = SinkTask::start(config, Box::new(ObjectDocumentStore::in_memory())).await?;
//!
//! let serde_json::Value::Object(doc) = json!({"id": "o-1", "total": 3}) else { unreachable!() };
//! let record = InboundRecord::new("orders", 0, 0, SchemaKind::Map, InboundValue::Mapping(doc));
//! task.process(&[record]).await?;
//! task.stop().await?;
//! # Ok(())
//! # }
//! ```

use docsink_core::{StoreClient, StoreError, StoreSpec};

/// Topic routing and single-record upserts
pub mod dispatcher;

/// Apache Kafka host runtime
pub mod source_kafka;

/// Object-store backed document store
pub mod store_object;

/// Standard output store for dry runs
pub mod store_stdout;

/// Sink task pipeline
pub mod task;

pub use dispatcher::WriteDispatcher;
pub use source_kafka::KafkaRecordSource;
pub use task::{BatchSummary, SinkTask, TaskState};

/// Builds the store client described by `spec`.
pub fn build_store(spec: &StoreSpec) -> Result<Box<dyn StoreClient>, StoreError> {
    let store: Box<dyn StoreClient> = match spec {
        StoreSpec::Memory => Box::new(store_object::ObjectDocumentStore::in_memory()),
        StoreSpec::LocalDir { path } => Box::new(store_object::ObjectDocumentStore::local_dir(path)?),
        StoreSpec::S3(s3) => Box::new(store_object::ObjectDocumentStore::s3(s3)?),
        StoreSpec::Stdout => Box::new(store_stdout::StdoutStore::new("stdout".into())),
    };
    Ok(store)
}
