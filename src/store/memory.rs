//! In-process document store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    with_id, Collection, DeleteResult, Document, DocumentId, DocumentStore, InsertResult,
    UpdateResult, ID_FIELD,
};
use crate::error::Result;

type Records = Vec<(DocumentId, Document)>;

/// Document store kept in memory, preserving insertion order
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<Collection, Records>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .map(|(id, doc)| with_id(doc.clone(), *id))
            .collect())
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
            .map(|(id, doc)| with_id(doc.clone(), *id))
            .collect())
    }

    async fn find_by_id(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(id, doc)| with_id(doc.clone(), *id)))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<InsertResult> {
        document.remove(ID_FIELD);
        let id = DocumentId::generate();
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push((id, document));

        Ok(InsertResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn upsert_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
        mut fields: Document,
    ) -> Result<UpdateResult> {
        fields.remove(ID_FIELD);
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();

        match records.iter_mut().find(|(doc_id, _)| *doc_id == id) {
            Some((_, existing)) => {
                let mut modified = false;
                for (key, value) in fields {
                    if existing.get(&key) != Some(&value) {
                        existing.insert(key, value);
                        modified = true;
                    }
                }
                Ok(UpdateResult::matched(modified))
            }
            None => {
                records.push((id, fields));
                Ok(UpdateResult::upserted(id))
            }
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> Result<DeleteResult> {
        let mut collections = self.collections.write().await;
        let deleted = match collections.get_mut(&collection) {
            Some(records) => {
                let before = records.len();
                records.retain(|(doc_id, _)| *doc_id != id);
                (before - records.len()) as u64
            }
            None => 0,
        };
        Ok(DeleteResult::deleted(deleted))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
