use docsink_core::{CollectionRouter, Document, SinkError, StoreClient, StoreError, WriteOutcome};
use tracing::{debug, info};

/// Sends normalized documents to the store, one upsert per call.
///
/// Store failures come back as [`WriteOutcome::Failed`] and never as an
/// `Err`; the caller decides what a failure means. Nothing is retried here.
pub struct WriteDispatcher {
    router: CollectionRouter,
    store: Box<dyn StoreClient>,
}

impl WriteDispatcher {
    pub fn new(router: CollectionRouter, store: Box<dyn StoreClient>) -> Self {
        Self { router, store }
    }

    /// Collection for a record's topic: explicit route, then the default.
    pub fn resolve(&self, topic: &str) -> Result<&str, SinkError> {
        self.router.resolve(topic)
    }

    pub async fn write(&self, collection: &str, document: &Document) -> WriteOutcome {
        let outcome = WriteOutcome::from(self.store.upsert(collection, document).await);
        debug!(
            store = self.store.name(),
            collection,
            success = outcome.is_success(),
            "upsert finished"
        );
        outcome
    }

    pub(crate) async fn connect(&mut self) -> Result<(), StoreError> {
        info!(store = self.store.name(), "connecting store client");
        self.store.connect().await
    }

    pub(crate) async fn close(&mut self) -> Result<(), StoreError> {
        info!(store = self.store.name(), "closing store client");
        self.store.close().await
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_object::ObjectDocumentStore;
    use serde_json::json;

    async fn dispatcher() -> WriteDispatcher {
        let router = CollectionRouter::with_default("docs").route("orders", "orders-coll");
        let mut d = WriteDispatcher::new(router, Box::new(ObjectDocumentStore::in_memory()));
        d.connect().await.unwrap();
        d
    }

    #[tokio::test]
    async fn test_resolve_prefers_route_over_default() {
        let d = dispatcher().await;
        assert_eq!(d.resolve("orders").unwrap(), "orders-coll");
        assert_eq!(d.resolve("anything").unwrap(), "docs");
    }

    #[tokio::test]
    async fn test_resolve_without_default_is_routing_error() {
        let d = WriteDispatcher::new(
            CollectionRouter::default().route("a", "b"),
            Box::new(ObjectDocumentStore::in_memory()),
        );
        assert!(matches!(d.resolve("c"), Err(SinkError::Routing { .. })));
    }

    #[tokio::test]
    async fn test_store_errors_become_failed_outcomes() {
        let d = dispatcher().await;
        assert!(d.write("docs", &json!({"id": "1"})).await.is_success());

        let outcome = d.write("docs", &json!("foo")).await;
        assert!(matches!(outcome, WriteOutcome::Failed(StoreError::MalformedRequest(_))));
    }
}
