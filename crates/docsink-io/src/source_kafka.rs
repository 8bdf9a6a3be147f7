use std::collections::HashMap;
use std::time::Duration;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::BorrowedMessage;
use rdkafka::{ClientConfig, Message as KafkaMessage, Offset, TopicPartitionList};

use anyhow::{Context, Result};
use docsink_core::{InboundRecord, InboundValue, KafkaSourceSpec, Scalar, SchemaKind, ValueFormat};
use serde_json::Value;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::task::SinkTask;

/// Host runtime that feeds a [`SinkTask`] from Kafka.
///
/// Offsets are committed manually, and only after the task accepted the
/// whole batch. A fatal task error stops the loop without committing, so the
/// failing batch is redelivered once the task is restarted.
pub struct KafkaRecordSource {
    spec: KafkaSourceSpec,
    consumer: StreamConsumer,
}

impl KafkaRecordSource {
    pub fn new(spec: KafkaSourceSpec) -> Result<Self, KafkaError> {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &spec.brokers)
            .set("group.id", &spec.group_id)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest");
        for (key, value) in &spec.consumer_properties {
            config.set(key, value);
        }
        let consumer: StreamConsumer = config.create()?;

        let topics: Vec<&str> = spec.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;
        info!("Subscribed to topics {:?} as group {}", spec.topics, spec.group_id);

        Ok(Self { spec, consumer })
    }

    /// Polls batches into `task` until cancelled or the task fails.
    pub async fn run(&self, task: &mut SinkTask, cancel: CancellationToken) -> Result<()> {
        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                batch = self.next_batch() => batch,
            };
            if batch.is_empty() {
                continue;
            }

            let summary = task
                .process(&batch)
                .await
                .with_context(|| format!("sink task '{}' failed", task.config().name))?;
            self.commit(&batch)?;
            info!(
                records = summary.records,
                written = summary.written,
                skipped = summary.skipped,
                "batch committed"
            );
        }
        info!("Kafka source cancelled");
        Ok(())
    }

    /// Collects up to `batch_size` records, or whatever arrived before the
    /// batch timeout.
    async fn next_batch(&self) -> Vec<InboundRecord> {
        let mut batch = Vec::with_capacity(self.spec.batch_size);
        let deadline = Instant::now() + Duration::from_millis(self.spec.batch_timeout_ms);
        while batch.len() < self.spec.batch_size {
            match timeout_at(deadline, self.consumer.recv()).await {
                Err(_) => break,
                Ok(Ok(message)) => batch.push(to_record(&message, self.spec.value_format)),
                Ok(Err(e)) => warn!("kafka error on consuming message from broker: {:?}", e),
            }
        }
        batch
    }

    fn commit(&self, batch: &[InboundRecord]) -> Result<(), KafkaError> {
        let mut tpl = TopicPartitionList::new();
        for ((topic, partition), offset) in next_offsets(batch) {
            tpl.add_partition_offset(topic, partition, Offset::Offset(offset))?;
        }
        debug!("committing {} partition offsets", tpl.count());
        self.consumer.commit(&tpl, CommitMode::Sync)
    }
}

/// Offset to commit per partition: one past the highest offset seen.
fn next_offsets(batch: &[InboundRecord]) -> HashMap<(&str, i32), i64> {
    let mut offsets: HashMap<(&str, i32), i64> = HashMap::new();
    for record in batch {
        let next = offsets.entry((record.topic.as_str(), record.partition)).or_insert(0);
        *next = (*next).max(record.offset + 1);
    }
    offsets
}

fn to_record(message: &BorrowedMessage<'_>, format: ValueFormat) -> InboundRecord {
    let (value_schema, value) = decode_value(message.payload(), format);
    InboundRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        key: message.key().map(<[u8]>::to_vec),
        value_schema,
        value,
        offset: message.offset(),
    }
}

/// Turns a payload into a declared schema kind and value.
///
/// Unparseable JSON is handed on as `BYTES`, and a non-UTF-8 payload under
/// the string format as raw bytes, so that normalization rejects them. They
/// are never dropped or rewritten here.
pub fn decode_value(payload: Option<&[u8]>, format: ValueFormat) -> (SchemaKind, InboundValue) {
    let Some(payload) = payload else {
        return (SchemaKind::Primitive, InboundValue::Null);
    };
    match format {
        ValueFormat::Json => match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => (SchemaKind::Map, InboundValue::Mapping(map)),
            Ok(other) => (SchemaKind::Primitive, from_json(other)),
            Err(_) => (SchemaKind::Bytes, InboundValue::Bytes(payload.to_vec())),
        },
        ValueFormat::String => match String::from_utf8(payload.to_vec()) {
            Ok(s) => (SchemaKind::Primitive, InboundValue::Primitive(Scalar::String(s))),
            Err(e) => (SchemaKind::Primitive, InboundValue::Bytes(e.into_bytes())),
        },
        ValueFormat::Bytes => (SchemaKind::Bytes, InboundValue::Bytes(payload.to_vec())),
    }
}

fn from_json(value: Value) -> InboundValue {
    match value {
        Value::Null => InboundValue::Null,
        Value::Bool(b) => InboundValue::Primitive(Scalar::Boolean(b)),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => InboundValue::Primitive(Scalar::Int(i)),
            (None, Some(u)) => InboundValue::Primitive(Scalar::UInt(u)),
            (None, None) => InboundValue::Primitive(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => InboundValue::Primitive(Scalar::String(s)),
        Value::Array(items) => InboundValue::Array(items.into_iter().map(from_json).collect()),
        Value::Object(map) => InboundValue::Mapping(map),
    }
}
