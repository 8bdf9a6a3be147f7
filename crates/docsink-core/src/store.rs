use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::Document;

/// Client for the external document store.
///
/// A task owns exactly one client for its whole lifetime: it is connected
/// when the task starts and closed when the task stops. Writes are issued
/// one at a time, so implementations need no internal locking for the
/// task's sake.
///
/// ## Examples
/// - Object-store backed documents (memory, local directory, S3)
/// - Console output for dry runs
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Returns the name of this client, used in logs.
    fn name(&self) -> &str;

    /// Acquire connections or sessions before the first write.
    async fn connect(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Create the document in `collection`, or replace the one with the same identity.
    ///
    /// Implementations do not retry on behalf of the caller.
    async fn upsert(&self, collection: &str, document: &Document) -> Result<(), StoreError>;

    /// Release everything acquired in [`connect`](StoreClient::connect).
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

