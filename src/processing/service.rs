//! Pipeline service coordinating upload storage, loading, splitting, and persistence.

use crate::config::Config;
use crate::db::schemas::{ASSET_TYPE_FILE, Asset, DataChunk, PROJECTS_COLLECTION, valid_project_id};
use crate::db::{
    self, AssetRepo, AssetStore, ChunkRepo, ChunkStore, ProjectRepo, ProjectStore, StoreError,
};
use crate::processing::types::{
    PipelineError, ProcessOptions, ProcessOutcome, StoredUpload, UploadError, UploadRequest,
};
use crate::processing::{loader, splitter, storage};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::fs;

/// Abstraction over the ingestion pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Validate and persist an uploaded file, registering its asset record.
    async fn store_upload<'a>(
        &self,
        project_id: &str,
        upload: UploadRequest<'a>,
    ) -> Result<StoredUpload, PipelineError>;

    /// Chunk one named asset or every file asset of a project.
    async fn process_project(
        &self,
        project_id: &str,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PipelineError>;
}

/// Coordinates the full pipeline: upload validation and storage, content
/// loading, splitting, and chunk persistence.
///
/// The service owns handles to the three stores and the process-wide
/// configuration. Construct it once near process start and share it through
/// an `Arc`.
pub struct PipelineService {
    config: Arc<Config>,
    projects: Arc<dyn ProjectRepo>,
    assets: Arc<dyn AssetRepo>,
    chunks: Arc<dyn ChunkRepo>,
}

impl PipelineService {
    /// Connect to MongoDB and bind the three stores.
    pub async fn connect(config: Arc<Config>) -> Result<Self, PipelineError> {
        let database = db::connect(&config).await?;
        let projects = Arc::new(ProjectStore::new(&database).await?);
        let assets = Arc::new(AssetStore::new(&database).await?);
        let chunks = Arc::new(ChunkStore::new(&database).await?);
        Ok(Self::with_repos(config, projects, assets, chunks))
    }

    /// Assemble a service from explicit repositories.
    ///
    /// Used by tests and by callers that bring their own storage backend.
    pub fn with_repos(
        config: Arc<Config>,
        projects: Arc<dyn ProjectRepo>,
        assets: Arc<dyn AssetRepo>,
        chunks: Arc<dyn ChunkRepo>,
    ) -> Self {
        Self {
            config,
            projects,
            assets,
            chunks,
        }
    }

    /// Resolve the effective MIME type of an upload: the declared part type
    /// wins, with a filename-based guess as fallback.
    fn resolve_mime(&self, file_name: &str, declared: Option<String>) -> Option<String> {
        declared.or_else(|| {
            mime_guess::from_path(file_name)
                .first_raw()
                .map(str::to_string)
        })
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn store_upload<'a>(
        &self,
        project_id: &str,
        upload: UploadRequest<'a>,
    ) -> Result<StoredUpload, PipelineError> {
        if !valid_project_id(project_id) {
            return Err(PipelineError::InvalidProjectId);
        }

        let mime = self.resolve_mime(&upload.file_name, upload.content_type.clone());
        if !mime
            .as_deref()
            .is_some_and(|value| self.config.is_allowed_type(value))
        {
            return Err(UploadError::TypeNotAllowed(mime).into());
        }

        let dir = storage::project_dir(&self.config.files_dir, project_id);
        fs::create_dir_all(&dir).await.map_err(UploadError::Io)?;

        let asset_name = storage::sanitize_filename(&upload.file_name);
        let stored_name = storage::unique_filename(&upload.file_name);
        let path = dir.join(&stored_name);
        let written = storage::write_stream(
            &path,
            upload.body,
            self.config.max_file_size_bytes(),
            self.config.file_chunk_size,
        )
        .await?;

        // The asset record is created only after the write fully succeeds, so
        // no partial file is ever referenced from the database.
        let project = self.projects.get_or_create(project_id).await?;
        let project_oid = project.id.ok_or(StoreError::MissingId {
            collection: PROJECTS_COLLECTION,
        })?;
        let asset = Asset::new_file(project_oid, asset_name, written, &stored_name);

        match self.assets.create(asset).await {
            Ok(asset) => {
                tracing::info!(
                    project_id,
                    file_id = %asset.asset_name,
                    size_bytes = written,
                    "Stored upload"
                );
                Ok(StoredUpload {
                    file_id: asset.asset_name,
                    size_bytes: written,
                })
            }
            Err(err) => {
                storage::remove_quietly(&path).await;
                Err(err.into())
            }
        }
    }

    async fn process_project(
        &self,
        project_id: &str,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PipelineError> {
        if !valid_project_id(project_id) {
            return Err(PipelineError::InvalidProjectId);
        }

        let project = self.projects.get_or_create(project_id).await?;
        let project_oid = project.id.ok_or(StoreError::MissingId {
            collection: PROJECTS_COLLECTION,
        })?;

        let targets = match &options.file_id {
            Some(file_id) => {
                let asset = self
                    .assets
                    .find_by_name(project_oid, file_id)
                    .await?
                    .ok_or_else(|| PipelineError::FileIdNotFound(file_id.clone()))?;
                vec![asset]
            }
            None => {
                let all = self
                    .assets
                    .list_for_project(project_oid, ASSET_TYPE_FILE)
                    .await?;
                if all.is_empty() {
                    return Err(PipelineError::NoFiles);
                }
                all
            }
        };

        // The reset is a single project-wide wipe, not a per-file replace.
        if options.do_reset == 1 {
            let removed = self.chunks.delete_for_project(project_oid).await?;
            tracing::info!(project_id, removed, "Reset project chunks");
        }

        let dir = storage::project_dir(&self.config.files_dir, project_id);
        let mut inserted_chunks = 0usize;
        let mut processed_files = 0usize;

        for asset in targets {
            let Some(asset_oid) = asset.id else {
                tracing::warn!(
                    project_id,
                    asset = %asset.asset_name,
                    "Asset record missing object id; skipping"
                );
                continue;
            };

            let path = dir.join(asset.stored_name());
            let records = match loader::load_records(&path).await {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(
                        project_id,
                        asset = %asset.asset_name,
                        error = %err,
                        "Skipping file that failed to load"
                    );
                    continue;
                }
            };

            let windows =
                splitter::split_records(&records, options.chunk_size, options.overlap_size)?;
            if windows.is_empty() {
                tracing::warn!(
                    project_id,
                    asset = %asset.asset_name,
                    "Skipping file that produced no chunks"
                );
                continue;
            }

            let documents: Vec<DataChunk> = windows
                .into_iter()
                .enumerate()
                .map(|(index, window)| DataChunk {
                    id: None,
                    chunk_text: window.text,
                    chunk_metadata: window.metadata,
                    chunk_order: (index + 1) as i64,
                    chunk_project_id: project_oid,
                    chunk_asset_id: asset_oid,
                })
                .collect();

            let inserted = self.chunks.insert_many(documents).await?;
            tracing::debug!(
                project_id,
                asset = %asset.asset_name,
                chunks = inserted,
                "File processed"
            );
            inserted_chunks += inserted;
            processed_files += 1;
        }

        if inserted_chunks == 0 {
            return Err(PipelineError::NoChunksProduced);
        }

        tracing::info!(
            project_id,
            chunks = inserted_chunks,
            files = processed_files,
            "Processing pass completed"
        );
        Ok(ProcessOutcome {
            inserted_chunks,
            processed_files,
        })
    }
}
