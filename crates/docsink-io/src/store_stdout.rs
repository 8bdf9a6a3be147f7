use async_trait::async_trait;
use docsink_core::{Document, StoreClient, StoreError};

/// Prints each upsert as `collection<TAB>document`; never fails.
pub struct StdoutStore {
    id: String,
}

impl StdoutStore {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn render(collection: &str, document: &Document) -> String {
        format!("{collection}\t{document}")
    }
}

#[async_trait]
impl StoreClient for StdoutStore {
    fn name(&self) -> &str {
        &self.id
    }

    async fn upsert(&self, collection: &str, document: &Document) -> Result<(), StoreError> {
        println!("{}", Self::render(collection, document));
        Ok(())
    }
}
