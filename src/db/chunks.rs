//! Chunk records: bulk-created during processing, wholesale-deleted on reset.

use crate::db::schemas::{CHUNKS_COLLECTION, DataChunk};
use crate::db::{StoreError, ensure_collection};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

/// Number of chunk documents written per insert batch. Bounds request size
/// only; a failure partway through leaves earlier batches in place.
pub const INSERT_BATCH_SIZE: usize = 100;

/// Operations the pipeline needs from chunk storage.
#[async_trait]
pub trait ChunkRepo: Send + Sync {
    /// Insert chunks in fixed-size batches; returns the number inserted.
    async fn insert_many(&self, chunks: Vec<DataChunk>) -> Result<usize, StoreError>;

    /// Delete every chunk belonging to a project; returns the number removed.
    async fn delete_for_project(&self, project_id: ObjectId) -> Result<u64, StoreError>;

    /// Fetch a single chunk by object id.
    async fn find_by_id(&self, chunk_id: ObjectId) -> Result<Option<DataChunk>, StoreError>;
}

/// MongoDB-backed chunk store.
pub struct ChunkStore {
    collection: Collection<DataChunk>,
}

impl ChunkStore {
    /// Bind to the chunks collection, creating it and its indexes when missing.
    pub async fn new(db: &Database) -> Result<Self, StoreError> {
        ensure_collection(db, CHUNKS_COLLECTION, DataChunk::indexes()).await?;
        Ok(Self {
            collection: db.collection(CHUNKS_COLLECTION),
        })
    }
}

#[async_trait]
impl ChunkRepo for ChunkStore {
    async fn insert_many(&self, chunks: Vec<DataChunk>) -> Result<usize, StoreError> {
        for batch in chunks.chunks(INSERT_BATCH_SIZE) {
            self.collection.insert_many(batch).await?;
        }
        Ok(chunks.len())
    }

    async fn delete_for_project(&self, project_id: ObjectId) -> Result<u64, StoreError> {
        let outcome = self
            .collection
            .delete_many(doc! { "chunk_project_id": project_id })
            .await?;
        Ok(outcome.deleted_count)
    }

    async fn find_by_id(&self, chunk_id: ObjectId) -> Result<Option<DataChunk>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": chunk_id }).await?)
    }
}
