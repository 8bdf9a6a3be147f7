use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use docsink_core::{Document, S3StoreSpec, StoreClient, StoreError};
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path as ObjectPath,
    ObjectStore,
};
use serde_json::Value;
use tracing::info;

/// Document store on top of an [`ObjectStore`].
///
/// Each document lives at `{prefix}/{collection}/{id}.json`. A `put` to an
/// existing path replaces it, so an upsert is a single put keyed by the
/// document's `id`.
pub struct ObjectDocumentStore {
    name: String,
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    connected: bool,
}

impl ObjectDocumentStore {
    pub fn new(name: &str, store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            store,
            prefix: prefix.filter(|p| !p.is_empty()),
            connected: false,
        }
    }

    pub fn in_memory() -> Self {
        Self::new("memory", Arc::new(InMemory::new()), None)
    }

    /// Documents stored as files below `dir`, which is created if missing.
    pub fn local_dir(dir: impl AsRef<FsPath>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", dir.display())))?;
        let fs = LocalFileSystem::new_with_prefix(dir).map_err(unavailable)?;
        Ok(Self::new("local_dir", Arc::new(fs), None))
    }

    /// S3-compatible bucket (AWS, MinIO).
    pub fn s3(spec: &S3StoreSpec) -> Result<Self, StoreError> {
        info!("Creating S3-compatible document store with endpoint: {}", spec.endpoint);
        let s3 = AmazonS3Builder::new()
            .with_endpoint(&spec.endpoint)
            .with_access_key_id(&spec.access_key)
            .with_secret_access_key(&spec.secret_key)
            .with_region(&spec.region)
            .with_bucket_name(&spec.bucket)
            .with_allow_http(spec.allow_http)
            .build()
            .map_err(unavailable)?;
        Ok(Self::new("s3", Arc::new(s3), spec.prefix.clone()))
    }

    pub fn document_path(&self, collection: &str, id: &str) -> ObjectPath {
        let file = format!("{id}.json");
        let prefix = self.prefix.as_deref().unwrap_or_default();
        ObjectPath::from_iter(
            prefix
                .split('/')
                .filter(|segment| !segment.is_empty())
                .chain([collection, file.as_str()]),
        )
    }

    /// Reads a stored document back, `None` if absent.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let path = self.document_path(collection, id);
        let bytes = match self.store.get(&path).await {
            Ok(result) => result.bytes().await.map_err(transient)?,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(transient(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::MalformedRequest(format!("stored document at {path} is not JSON: {e}")))
    }
}

#[async_trait]
impl StoreClient for ObjectDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), StoreError> {
        self.connected = true;
        info!("Document store '{}' ready at {}", self.name, self.store);
        Ok(())
    }

    async fn upsert(&self, collection: &str, document: &Document) -> Result<(), StoreError> {
        if !self.connected {
            return Err(StoreError::Unavailable(format!("store '{}' is not connected", self.name)));
        }
        let id = document_id(document)?;
        let payload = serde_json::to_vec(document).map_err(|e| StoreError::MalformedRequest(e.to_string()))?;
        let path = self.document_path(collection, &id);
        self.store.put(&path, payload.into()).await.map_err(transient)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.connected = false;
        Ok(())
    }
}

/// Identity of a document: its non-empty string or integer `id` field.
fn document_id(document: &Document) -> Result<String, StoreError> {
    let Value::Object(map) = document else {
        return Err(StoreError::MalformedRequest(format!(
            "document must be a JSON object, got {document}"
        )));
    };
    match map.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) if id.is_i64() || id.is_u64() => Ok(id.to_string()),
        Some(other) => Err(StoreError::MalformedRequest(format!(
            "document id must be a non-empty string or an integer, got {other}"
        ))),
        None => Err(StoreError::MalformedRequest("document has no 'id' field".to_string())),
    }
}

fn transient(e: object_store::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

fn unavailable(e: object_store::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn connected(mut store: ObjectDocumentStore) -> ObjectDocumentStore {
        store.connect().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_upsert_creates_then_replaces() {
        let store = connected(ObjectDocumentStore::in_memory()).await;
        store.upsert("docs", &json!({"id": "a", "v": 1})).await.unwrap();
        store.upsert("docs", &json!({"id": "a", "v": 2})).await.unwrap();
        store.upsert("other", &json!({"id": 7})).await.unwrap();

        assert_eq!(store.get("docs", "a").await.unwrap(), Some(json!({"id": "a", "v": 2})));
        assert_eq!(store.get("other", "7").await.unwrap(), Some(json!({"id": 7})));
        assert_eq!(store.get("docs", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_documents_without_identity() {
        let store = connected(ObjectDocumentStore::in_memory()).await;
        for doc in [json!("foo"), json!({"foo": "bar"}), json!({"id": ""}), json!({"id": 1.5}), json!(null)] {
            let err = store.upsert("docs", &doc).await.unwrap_err();
            assert!(matches!(err, StoreError::MalformedRequest(_)), "{doc}: {err}");
        }
    }

    #[tokio::test]
    async fn test_upsert_requires_connect() {
        let mut store = ObjectDocumentStore::in_memory();
        let doc = json!({"id": "a"});
        assert!(matches!(store.upsert("docs", &doc).await, Err(StoreError::Unavailable(_))));

        store.connect().await.unwrap();
        store.upsert("docs", &doc).await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(store.upsert("docs", &doc).await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_local_dir_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = connected(ObjectDocumentStore::local_dir(dir.path().join("data")).unwrap()).await;
        store.upsert("orders", &json!({"id": "o-1", "total": 3})).await.unwrap();

        let file = dir.path().join("data").join("orders").join("o-1.json");
        let stored: Value = serde_json::from_slice(&std::fs::read(file).unwrap()).unwrap();
        assert_eq!(stored, json!({"id": "o-1", "total": 3}));
    }

    #[test]
    fn test_document_path_with_prefix() {
        let store = ObjectDocumentStore::new("t", Arc::new(InMemory::new()), Some("tenant".into()));
        assert_eq!(store.document_path("docs", "x").as_ref(), "tenant/docs/x.json");

        let nested = ObjectDocumentStore::new("t", Arc::new(InMemory::new()), Some("/tenant/sub/".into()));
        assert_eq!(nested.document_path("docs", "x").as_ref(), "tenant/sub/docs/x.json");

        let bare = ObjectDocumentStore::new("t", Arc::new(InMemory::new()), None);
        assert_eq!(bare.document_path("docs", "x").as_ref(), "docs/x.json");
    }
}
