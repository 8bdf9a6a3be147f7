//! # DocSink Core
//!
//! Foundational types for DocSink tasks: the inbound record model, the error
//! taxonomy, task configuration, the [`StoreClient`] abstraction and the
//! write-tolerance policy.
//!
//! ## Key Components
//!
//! - **Records**: [`InboundRecord`] with a declared [`SchemaKind`] and a tagged [`InboundValue`]
//! - **Configuration**: YAML [`SinkTaskSpec`] validated into an immutable [`SinkTaskConfig`]
//! - **Store Clients**: the [`StoreClient`] trait implemented by document store backends
//! - **Tolerance**: [`TolerancePolicy`] deciding whether a failed write stops the task
//! - **Error Handling**: [`SinkError`] and [`StoreError`]
//!
//! ## Example Usage
//!
//! ```rust
//! use docsink_core::{CollectionRouter, SinkTaskConfig, ToleranceMode};
//!
//! let router = CollectionRouter::with_default("documents").route("orders", "orders");
//! let config = SinkTaskConfig::new("orders-sink", router, ToleranceMode::All);
//! assert_eq!(config.router.resolve("payments").unwrap(), "documents");
//! ```

pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod tolerance;

pub use config::{
    parse_topic_collections, CollectionRouter, IdStrategy, KafkaSourceSpec, S3StoreSpec,
    SinkTaskConfig, SinkTaskSpec, StoreSpec, ToleranceMode, TopicCollectionsSpec, ValueFormat,
};
pub use error::{Result, SinkError, StoreError};
pub use record::{
    Document, FieldKind, FieldSchema, InboundRecord, InboundValue, Scalar, SchemaKind,
    StructSchema, StructValue,
};
pub use store::StoreClient;
pub use tolerance::{PolicyResult, TolerancePolicy, WriteMetrics, WriteMetricsSnapshot, WriteOutcome};
