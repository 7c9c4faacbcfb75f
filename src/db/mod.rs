//! MongoDB persistence layer for projects, assets, and data chunks.
//!
//! Each store wraps one collection and ensures it exists (with its declared
//! indexes) the first time the store is constructed. Uniqueness is enforced by
//! database-level unique indexes; a lost race surfaces as
//! [`StoreError::Duplicate`] rather than application-level conflict handling.

pub mod assets;
pub mod chunks;
pub mod projects;
pub mod schemas;

pub use assets::{AssetRepo, AssetStore};
pub use chunks::{ChunkRepo, ChunkStore};
pub use projects::{ProjectRepo, ProjectStore};

use crate::config::Config;
use mongodb::bson::Document;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::{Client, Database, IndexModel};
use thiserror::Error;

/// Errors returned by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or server-side failure reported by the MongoDB driver.
    #[error("database request failed: {0}")]
    Mongo(#[from] MongoError),
    /// A unique index rejected the write.
    #[error("duplicate key in `{collection}`")]
    Duplicate {
        /// Collection whose unique index rejected the write.
        collection: &'static str,
    },
    /// A fetched record is missing its `_id`, which the pipeline relies on.
    #[error("record in `{collection}` is missing its object id")]
    MissingId {
        /// Collection the malformed record came from.
        collection: &'static str,
    },
}

/// Open a connection to the configured database.
pub async fn connect(config: &Config) -> Result<Database, StoreError> {
    let client = Client::with_uri_str(&config.mongodb_url).await?;
    tracing::debug!(database = %config.mongodb_database, "Connected to MongoDB");
    Ok(client.database(&config.mongodb_database))
}

/// Create the collection and its indexes when it does not exist yet.
///
/// Mirrors the lazy bootstrap behavior of the stores: collections are only
/// created (and indexed) on first access, never migrated.
pub(crate) async fn ensure_collection(
    db: &Database,
    name: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), StoreError> {
    let existing = db.list_collection_names().await?;
    if existing.iter().any(|collection| collection == name) {
        return Ok(());
    }

    db.create_collection(name).await?;
    if !indexes.is_empty() {
        db.collection::<Document>(name).create_indexes(indexes).await?;
    }
    tracing::debug!(collection = name, "Created collection and indexes");
    Ok(())
}

/// Whether the driver error is a unique-index violation (code 11000).
pub(crate) fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}
