//! Asset records: one per successfully uploaded file.

use crate::db::schemas::{ASSETS_COLLECTION, Asset};
use crate::db::{StoreError, ensure_collection, is_duplicate_key};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

/// Operations the pipeline needs from asset storage.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Insert a new asset record. Fails with [`StoreError::Duplicate`] when the
    /// project already has an asset with the same name.
    async fn create(&self, asset: Asset) -> Result<Asset, StoreError>;

    /// All assets of the given type belonging to a project.
    async fn list_for_project(
        &self,
        project_id: ObjectId,
        asset_type: &str,
    ) -> Result<Vec<Asset>, StoreError>;

    /// Look up a single asset by its client-facing name.
    async fn find_by_name(
        &self,
        project_id: ObjectId,
        asset_name: &str,
    ) -> Result<Option<Asset>, StoreError>;
}

/// MongoDB-backed asset store.
pub struct AssetStore {
    collection: Collection<Asset>,
}

impl AssetStore {
    /// Bind to the assets collection, creating it and its indexes when missing.
    pub async fn new(db: &Database) -> Result<Self, StoreError> {
        ensure_collection(db, ASSETS_COLLECTION, Asset::indexes()).await?;
        Ok(Self {
            collection: db.collection(ASSETS_COLLECTION),
        })
    }
}

#[async_trait]
impl AssetRepo for AssetStore {
    async fn create(&self, mut asset: Asset) -> Result<Asset, StoreError> {
        match self.collection.insert_one(&asset).await {
            Ok(outcome) => {
                asset.id = outcome.inserted_id.as_object_id();
                Ok(asset)
            }
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate {
                collection: ASSETS_COLLECTION,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_for_project(
        &self,
        project_id: ObjectId,
        asset_type: &str,
    ) -> Result<Vec<Asset>, StoreError> {
        let mut cursor = self
            .collection
            .find(doc! { "asset_project_id": project_id, "asset_type": asset_type })
            .await?;

        let mut assets = Vec::new();
        while let Some(asset) = cursor.try_next().await? {
            assets.push(asset);
        }
        Ok(assets)
    }

    async fn find_by_name(
        &self,
        project_id: ObjectId,
        asset_name: &str,
    ) -> Result<Option<Asset>, StoreError> {
        Ok(self
            .collection
            .find_one(doc! { "asset_project_id": project_id, "asset_name": asset_name })
            .await?)
    }
}
