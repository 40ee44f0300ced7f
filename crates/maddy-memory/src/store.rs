// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector store with embeddings stored as BLOBs.
//!
//! Similarity search is brute force: every embedding of the requested
//! collection is scored by cosine similarity against the query embedding.
//! All access goes through one `tokio-rusqlite` connection thread.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use maddy_core::error::MaddyError;
use maddy_core::traits::{EmbeddingAdapter, PluginAdapter, VectorStoreAdapter};
use maddy_core::types::{
    AdapterType, Collection, Document, DocumentMetadata, EmbeddingInput, HealthStatus,
};
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use crate::types::{blob_to_vec, cosine_similarity, l2_normalize, vec_to_blob};

/// Database file created inside the configured memory directory.
pub const DATABASE_FILE: &str = "maddy.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY NOT NULL,
        collection TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );
    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);";

/// Converts any storage-layer error into [`MaddyError::Storage`].
fn storage_err<E>(e: E) -> MaddyError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MaddyError::Storage {
        source: Box::new(e),
    }
}

/// A row loaded for scoring.
struct StoredRow {
    content: String,
    metadata: String,
    embedding: Vec<f32>,
}

/// Persistent [`VectorStoreAdapter`] over a single SQLite file.
pub struct SqliteVectorStore {
    conn: Connection,
    embedder: Arc<dyn EmbeddingAdapter>,
}

impl SqliteVectorStore {
    /// Opens (creating if needed) `<dir>/maddy.db` and applies the schema.
    pub async fn open(dir: &Path, embedder: Arc<dyn EmbeddingAdapter>) -> Result<Self, MaddyError> {
        tokio::fs::create_dir_all(dir).await.map_err(storage_err)?;
        let path = dir.join(DATABASE_FILE);
        let conn = Connection::open(&path).await.map_err(storage_err)?;
        conn.call(|conn| -> Result<String, rusqlite::Error> {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        })
        .await
        .map_err(storage_err)?;

        let store = Self::with_connection(conn, embedder).await?;
        debug!(path = %path.display(), "memory database opened");
        Ok(store)
    }

    /// Opens a throwaway in-memory database.
    pub async fn open_in_memory(embedder: Arc<dyn EmbeddingAdapter>) -> Result<Self, MaddyError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        Self::with_connection(conn, embedder).await
    }

    async fn with_connection(
        conn: Connection,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, MaddyError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(SCHEMA) })
            .await
            .map_err(storage_err)?;
        Ok(Self { conn, embedder })
    }

    /// Embeds one text and normalizes it for cosine scoring.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MaddyError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        let mut embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MaddyError::Internal("embedding returned no results".to_string()))?;
        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: Collection) -> Result<usize, MaddyError> {
        let name = collection.as_str();
        self.conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    rusqlite::params![name],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n as usize)
            })
            .await
            .map_err(storage_err)
    }

    async fn load_rows(&self, collection: Collection) -> Result<Vec<StoredRow>, MaddyError> {
        let name = collection.as_str();
        self.conn
            .call(move |conn| -> Result<Vec<StoredRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT content, metadata, embedding FROM documents WHERE collection = ?1",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![name], |row| {
                        let blob: Vec<u8> = row.get(2)?;
                        Ok(StoredRow {
                            content: row.get(0)?,
                            metadata: row.get(1)?,
                            embedding: blob_to_vec(&blob),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(storage_err)
    }
}

/// Rebuilds a [`Document`], tolerating metadata written by older builds.
fn row_to_document(row: StoredRow) -> Document {
    match serde_json::from_str::<DocumentMetadata>(&row.metadata) {
        Ok(metadata) => Document {
            content: row.content,
            metadata,
        },
        Err(e) => {
            warn!(error = %e, "unreadable document metadata, using defaults");
            Document::new(row.content)
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite-vector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MaddyError> {
        let probe = self
            .conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        Ok(match probe {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), MaddyError> {
        debug!("sqlite vector store shutting down");
        Ok(())
    }
}

#[async_trait]
impl VectorStoreAdapter for SqliteVectorStore {
    async fn add(&self, collection: Collection, document: Document) -> Result<(), MaddyError> {
        let embedding_blob = vec_to_blob(&self.embed_one(&document.content).await?);
        let metadata = serde_json::to_string(&document.metadata).map_err(storage_err)?;
        let id = uuid::Uuid::new_v4().to_string();
        let name = collection.as_str();
        let content = document.content;
        let created_at = document.metadata.recorded_at.to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO documents (id, collection, content, embedding, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![id, name, content, embedding_blob, metadata, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn similarity_search(
        &self,
        collection: Collection,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, MaddyError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_one(query).await?;
        let mut scored: Vec<(f32, StoredRow)> = self
            .load_rows(collection)
            .await?
            .into_iter()
            .map(|row| (cosine_similarity(&query_embedding, &row.embedding), row))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        debug!(
            collection = %collection,
            hits = scored.len(),
            top_score = scored.first().map(|(s, _)| *s),
            "similarity search complete"
        );

        Ok(scored.into_iter().map(|(_, row)| row_to_document(row)).collect())
    }
}
