//! PostgreSQL-backed document store
//!
//! All collections share one `documents` table holding each document as
//! JSONB. Every operation is a single statement, so each is atomic on its
//! own; there are no multi-document transactions.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use super::{
    with_id, Collection, DeleteResult, Document, DocumentId, DocumentStore, InsertResult,
    UpdateResult, ID_FIELD,
};
use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id UUID NOT NULL,
    body JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
)";

// `prev` reads the pre-statement snapshot, so `changed` compares the body
// before and after the merge.
const UPSERT: &str = "
WITH prev AS (
    SELECT body FROM documents WHERE collection = $1 AND id = $2
), up AS (
    INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)
    ON CONFLICT (collection, id) DO UPDATE SET body = documents.body || EXCLUDED.body
    RETURNING (xmax = 0) AS inserted, body
)
SELECT up.inserted, (prev.body IS DISTINCT FROM up.body) AS changed
FROM up LEFT JOIN prev ON true";

/// Document store over a single shared PostgreSQL connection
pub struct PostgresStore {
    client: Client,
    connection: Mutex<Option<JoinHandle<()>>>,
}

impl PostgresStore {
    /// Connect using a libpq-style connection string and ensure the schema
    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        // Spawn the connection handler
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        client.batch_execute(SCHEMA).await?;
        tracing::info!("Connected to PostgreSQL document store");

        Ok(Self {
            client,
            connection: Mutex::new(Some(handle)),
        })
    }

    fn row_to_document(row: &Row) -> Result<Document> {
        let id: Uuid = row.try_get("id")?;
        match row.try_get::<_, Value>("body")? {
            Value::Object(map) => Ok(with_id(map, id.into())),
            other => Err(Error::Store(format!(
                "document {} is not an object: {}",
                id, other
            ))),
        }
    }

    fn rows_to_documents(rows: &[Row]) -> Result<Vec<Document>> {
        rows.iter().map(Self::row_to_document).collect()
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let rows = self
            .client
            .query(
                "SELECT id, body FROM documents WHERE collection = $1 ORDER BY created_at, id",
                &[&collection.as_str()],
            )
            .await?;
        Self::rows_to_documents(&rows)
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let rows = self
            .client
            .query(
                "SELECT id, body FROM documents \
                 WHERE collection = $1 AND body ->> $2 = $3 \
                 ORDER BY created_at, id",
                &[&collection.as_str(), &field, &value],
            )
            .await?;
        Self::rows_to_documents(&rows)
    }

    async fn find_by_id(&self, collection: Collection, id: DocumentId) -> Result<Option<Document>> {
        let row = self
            .client
            .query_opt(
                "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
                &[&collection.as_str(), &id.as_uuid()],
            )
            .await?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<InsertResult> {
        document.remove(ID_FIELD);
        let id = DocumentId::generate();
        self.client
            .execute(
                "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)",
                &[&collection.as_str(), &id.as_uuid(), &Value::Object(document)],
            )
            .await?;

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
        let row = self
            .client
            .query_one(
                UPSERT,
                &[&collection.as_str(), &id.as_uuid(), &Value::Object(fields)],
            )
            .await?;

        let inserted: bool = row.try_get("inserted")?;
        let changed: bool = row.try_get("changed")?;
        if inserted {
            Ok(UpdateResult::upserted(id))
        } else {
            Ok(UpdateResult::matched(changed))
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> Result<DeleteResult> {
        let deleted = self
            .client
            .execute(
                "DELETE FROM documents WHERE collection = $1 AND id = $2",
                &[&collection.as_str(), &id.as_uuid()],
            )
            .await?;
        Ok(DeleteResult::deleted(deleted))
    }

    async fn ping(&self) -> Result<()> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(handle) = self.connection.lock().await.take() {
            handle.abort();
            tracing::info!("Closed PostgreSQL document store");
        }
    }
}
