use docsink_core::{Document, IdStrategy, InboundRecord};
use serde_json::Value;
use tracing::debug;

/// Field the store uses as a document's identity.
pub const ID_FIELD: &str = "id";

/// Applies the configured [`IdStrategy`] to a normalized document.
///
/// Only object documents get an id assigned; anything else is returned
/// untouched and left for the store to accept or reject.
pub fn assign_id(strategy: IdStrategy, record: &InboundRecord, document: Document) -> Document {
    match (strategy, document) {
        (IdStrategy::ProvidedInValue, document) => document,
        (IdStrategy::KafkaMetadata, Value::Object(mut map)) => {
            let id = format!("{}-{}-{}", record.topic, record.partition, record.offset);
            debug!(%id, "assigning document id from record metadata");
            map.insert(ID_FIELD.to_string(), Value::String(id));
            Value::Object(map)
        }
        (IdStrategy::KafkaMetadata, other) => other,
    }
}
