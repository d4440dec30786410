//! Document store
//!
//! Handlers talk to a [`DocumentStore`]; each operation is a single atomic
//! store action. Documents are JSON objects carrying their id under `_id`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Key under which a document's id is exposed
pub const ID_FIELD: &str = "_id";

/// A stored record
pub type Document = Map<String, Value>;

/// Named document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Queries,
    Recommendations,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Queries => "queries",
            Collection::Recommendations => "recommendations",
        }
    }

    /// Field naming the owning email
    pub fn owner_field(&self) -> &'static str {
        match self {
            Collection::Queries => "email",
            Collection::Recommendations => "recommenderEmail",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-assigned document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::BadRequest(format!("invalid document id: {}", s)))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<DocumentId>,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_count: 0,
            upserted_id: None,
        }
    }

    pub fn upserted(id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn deleted(count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count: count,
        }
    }
}

/// Persistent key-document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in the collection, oldest first
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>>;

    /// Documents whose string `field` equals `value`
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>>;

    async fn find_by_id(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>>;

    /// Store `document` under a fresh id. Any `_id` in the input is ignored.
    async fn insert_one(&self, collection: Collection, document: Document)
        -> Result<InsertResult>;

    /// Set `fields` on the document, creating it under `id` when absent.
    /// Fields not named in `fields` are left as they are.
    async fn upsert_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> Result<UpdateResult>;

    /// Delete by id. A missing id reports zero deletions.
    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> Result<DeleteResult>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Release the store's connections
    async fn close(&self) {}
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Open the store selected by configuration
pub async fn connect(config: &StoreConfig) -> Result<SharedStore> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(&config.url).await?;
            store.ping().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Attach `id` to `document` under [`ID_FIELD`]
pub(crate) fn with_id(mut document: Document, id: DocumentId) -> Document {
    document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    document
}
