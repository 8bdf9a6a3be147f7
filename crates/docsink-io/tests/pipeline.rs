use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docsink_core::{
    CollectionRouter, Document, InboundRecord, InboundValue, Scalar, SchemaKind, SinkError,
    SinkTaskConfig, StoreClient, StoreError, ToleranceMode,
};
use docsink_io::{SinkTask, TaskState};
use serde_json::{json, Value};

type Calls = Arc<Mutex<Vec<(String, Document)>>>;

/// Records every upsert; fails the calls whose index is listed in `fail_on`.
struct RecordingStore {
    calls: Calls,
    fail_on: Option<HashSet<usize>>,
    fail_all: bool,
}

impl RecordingStore {
    fn ok() -> (Self, Calls) {
        Self::build(None, false)
    }

    fn always_failing() -> (Self, Calls) {
        Self::build(None, true)
    }

    fn failing_on(indices: &[usize]) -> (Self, Calls) {
        Self::build(Some(indices.iter().copied().collect()), false)
    }

    fn build(fail_on: Option<HashSet<usize>>, fail_all: bool) -> (Self, Calls) {
        let calls = Calls::default();
        (
            Self {
                calls: calls.clone(),
                fail_on,
                fail_all,
            },
            calls,
        )
    }
}

#[async_trait]
impl StoreClient for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upsert(&self, collection: &str, document: &Document) -> Result<(), StoreError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((collection.to_string(), document.clone()));
            calls.len() - 1
        };
        let fails = self.fail_all || self.fail_on.as_ref().is_some_and(|f| f.contains(&index));
        if fails {
            Err(StoreError::MalformedRequest("Unable to serialize JSON request".into()))
        } else {
            Ok(())
        }
    }
}

fn config(tolerance: ToleranceMode) -> SinkTaskConfig {
    SinkTaskConfig::new("test", CollectionRouter::with_default("defaultCollection"), tolerance)
}

async fn start(tolerance: ToleranceMode, store: RecordingStore) -> SinkTask {
    SinkTask::start(config(tolerance), Box::new(store)).await.unwrap()
}

fn map_record(offset: i64, value: Value) -> InboundRecord {
    let Value::Object(map) = value else {
        panic!("map records need an object value")
    };
    InboundRecord::new("t", 1, offset, SchemaKind::Map, InboundValue::Mapping(map))
}

fn string_record(offset: i64, schema: SchemaKind, value: &str) -> InboundRecord {
    InboundRecord::new("t", 1, offset, schema, InboundValue::Primitive(Scalar::from(value)))
        .with_key(b"nokey".to_vec())
}

fn ordered_batch(n: i64) -> Vec<InboundRecord> {
    (0..n).map(|i| map_record(i, json!({"id": i.to_string(), "seq": i}))).collect()
}

#[tokio::test]
async fn map_record_is_written_verbatim_to_default_collection() {
    let (store, calls) = RecordingStore::ok();
    let mut task = start(ToleranceMode::All, store).await;

    let summary = task.process(&[map_record(0, json!({"foo": "bar"}))]).await.unwrap();

    assert_eq!(summary.written, 1);
    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec![("defaultCollection".to_string(), json!({"foo": "bar"}))]);
}

#[tokio::test]
async fn primitive_write_failure_is_fatal_under_none() {
    let (store, calls) = RecordingStore::always_failing();
    let mut task = start(ToleranceMode::None, store).await;

    let err = task
        .process(&[string_record(0, SchemaKind::Primitive, "foo")])
        .await
        .unwrap_err();

    assert!(matches!(err, SinkError::Write { offset: 0, .. }), "{err}");
    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec![("defaultCollection".to_string(), json!("foo"))]);
}

#[tokio::test]
async fn malformed_map_write_failure_is_skipped_under_all() {
    let (store, calls) = RecordingStore::always_failing();
    let mut task = start(ToleranceMode::All, store).await;

    let summary = task
        .process(&[string_record(0, SchemaKind::Map, "{")])
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(task.state(), TaskState::Ready);
}

#[tokio::test]
async fn primitive_write_failure_is_skipped_under_all() {
    let (store, calls) = RecordingStore::always_failing();
    let mut task = start(ToleranceMode::All, store).await;

    task.process(&[string_record(0, SchemaKind::Primitive, "foo")]).await.unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn tolerance_all_absorbs_every_write_failure() {
    let (store, calls) = RecordingStore::always_failing();
    let mut task = start(ToleranceMode::All, store).await;

    let summary = task.process(&ordered_batch(5)).await.unwrap();
    assert_eq!(summary.records, 5);
    assert_eq!(summary.skipped, 5);
    assert_eq!(calls.lock().unwrap().len(), 5);

    // Later batches are unaffected.
    task.process(&ordered_batch(2)).await.unwrap();
    assert_eq!(task.metrics().skipped_total, 7);
}

#[tokio::test]
async fn tolerance_none_stops_at_failing_record() {
    let (store, calls) = RecordingStore::failing_on(&[2]);
    let mut task = start(ToleranceMode::None, store).await;

    let err = task.process(&ordered_batch(5)).await.unwrap_err();

    assert!(matches!(err, SinkError::Write { offset: 2, .. }), "{err}");
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(task.metrics().written_total, 2);
    assert_eq!(task.metrics().failed_total, 1);
}

#[tokio::test]
async fn serialization_failure_is_fatal_even_under_all() {
    let (store, calls) = RecordingStore::ok();
    let mut task = start(ToleranceMode::All, store).await;

    let bad = InboundRecord::new("t", 1, 1, SchemaKind::Bytes, InboundValue::Bytes(b"{".to_vec()));
    let batch = vec![map_record(0, json!({"id": "a"})), bad, map_record(2, json!({"id": "c"}))];

    let err = task.process(&batch).await.unwrap_err();

    assert!(err.is_serialization(), "{err}");
    assert!(matches!(err, SinkError::Serialization { offset: 1, .. }));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(task.state(), TaskState::Failed);
}

#[tokio::test]
async fn writes_follow_batch_order() {
    let (store, calls) = RecordingStore::ok();
    let mut task = start(ToleranceMode::None, store).await;

    task.process(&ordered_batch(20)).await.unwrap();

    let seqs: Vec<i64> = calls
        .lock()
        .unwrap()
        .iter()
        .map(|(_, doc)| doc["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn topics_are_routed_to_their_collections() {
    let (store, calls) = RecordingStore::ok();
    let router = CollectionRouter::with_default("fallback").route("orders", "orders-coll");
    let config = SinkTaskConfig::new("test", router, ToleranceMode::None);
    let mut task = SinkTask::start(config, Box::new(store)).await.unwrap();

    let mut order = map_record(0, json!({"id": "o"}));
    order.topic = "orders".into();
    task.process(&[order, map_record(1, json!({"id": "x"}))]).await.unwrap();

    let collections: Vec<String> = calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect();
    assert_eq!(collections, vec!["orders-coll", "fallback"]);
}
