//! Project records: created lazily on first reference.

use crate::db::schemas::{PROJECTS_COLLECTION, Project};
use crate::db::{StoreError, ensure_collection, is_duplicate_key};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

/// Operations the pipeline needs from project storage.
#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Fetch the project with the given user-facing id, creating it when absent.
    async fn get_or_create(&self, project_id: &str) -> Result<Project, StoreError>;

    /// Page through all projects; returns the page plus the total page count.
    async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<Project>, u64), StoreError>;
}

/// MongoDB-backed project store.
pub struct ProjectStore {
    collection: Collection<Project>,
}

impl ProjectStore {
    /// Bind to the projects collection, creating it and its indexes when missing.
    pub async fn new(db: &Database) -> Result<Self, StoreError> {
        ensure_collection(db, PROJECTS_COLLECTION, Project::indexes()).await?;
        Ok(Self {
            collection: db.collection(PROJECTS_COLLECTION),
        })
    }
}

#[async_trait]
impl ProjectRepo for ProjectStore {
    async fn get_or_create(&self, project_id: &str) -> Result<Project, StoreError> {
        if let Some(existing) = self
            .collection
            .find_one(doc! { "project_id": project_id })
            .await?
        {
            return Ok(existing);
        }

        let mut project = Project::new(project_id);
        match self.collection.insert_one(&project).await {
            Ok(outcome) => {
                project.id = outcome.inserted_id.as_object_id();
                tracing::info!(project_id, "Created project");
                Ok(project)
            }
            // Lost the unique-index race; the winner's record is now present.
            Err(err) if is_duplicate_key(&err) => self
                .collection
                .find_one(doc! { "project_id": project_id })
                .await?
                .ok_or(StoreError::Duplicate {
                    collection: PROJECTS_COLLECTION,
                }),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<Project>, u64), StoreError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = self.collection.count_documents(doc! {}).await?;
        let total_pages = total.div_ceil(page_size);

        let mut cursor = self
            .collection
            .find(doc! {})
            .skip((page - 1) * page_size)
            .limit(page_size as i64)
            .await?;

        let mut projects = Vec::new();
        while let Some(project) = cursor.try_next().await? {
            projects.push(project);
        }
        Ok((projects, total_pages))
    }
}
