//! HTTP surface: axum router, request handlers, and the signal vocabulary
//! returned to clients.

use crate::config::Config;
use crate::db::StoreError;
use crate::llm::LlmClient;
use crate::processing::{
    PipelineApi, ProcessOptions, UploadError, UploadRequest, PipelineError,
};
use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use std::sync::Arc;

/// Stable response signals clients match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSignal {
    /// Upload rejected: MIME type not on the allow-list.
    FileTypeNotSupported,
    /// Upload rejected: payload exceeds the configured limit.
    FileSizeTooLarge,
    /// Upload stored and registered.
    FileUploadSuccess,
    /// Upload could not be stored.
    FileUploadFailed,
    /// Upload rejected: the project already has a file with this name.
    FileAlreadyExists,
    /// Processing pass failed or produced nothing.
    ProcessingFailed,
    /// Processing pass completed.
    ProcessingSuccess,
    /// The project has no files to process.
    NoFilesFound,
    /// The requested file id matches no asset.
    FileIdNotFound,
    /// The project id failed validation.
    ProjectIdInvalid,
}

impl ResponseSignal {
    /// The wire string for this signal.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileTypeNotSupported => "File type not supported",
            Self::FileSizeTooLarge => "File size too large",
            Self::FileUploadSuccess => "File uploaded successfully",
            Self::FileUploadFailed => "File uploaded failed",
            Self::FileAlreadyExists => "File already exists",
            Self::ProcessingFailed => "Processing failed",
            Self::ProcessingSuccess => "Processing success",
            Self::NoFilesFound => "No files found",
            Self::FileIdNotFound => "File id not found",
            Self::ProjectIdInvalid => "Project id must be alphanumeric",
        }
    }
}

/// Shared state handed to every handler.
pub struct AppState<S> {
    /// Process-wide configuration.
    pub config: Arc<Config>,
    /// Ingestion pipeline behind the data routes.
    pub service: Arc<S>,
    /// Configured text-generation backend.
    pub generation: Arc<dyn LlmClient>,
    /// Configured embedding backend.
    pub embedding: Arc<dyn LlmClient>,
}

impl<S> AppState<S> {
    /// Bundle the shared components into a handler state.
    pub fn new(
        config: Arc<Config>,
        service: Arc<S>,
        generation: Arc<dyn LlmClient>,
        embedding: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            config,
            service,
            generation,
            embedding,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            service: self.service.clone(),
            generation: self.generation.clone(),
            embedding: self.embedding.clone(),
        }
    }
}

/// An error response carrying a status code and a client-facing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status to return.
    pub status: StatusCode,
    /// Signal string placed in the response body.
    pub signal: ResponseSignal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "signal": self.signal.as_str() }))).into_response()
    }
}

/// Build the application router over any pipeline implementation.
pub fn create_router<S: PipelineApi + 'static>(state: AppState<S>) -> Router {
    // The streaming writer enforces the real size cap; the body limit only has
    // to be generous enough not to cut uploads off below it.
    let body_limit = state.config.max_file_size_bytes() as usize + 1024 * 1024;
    Router::new()
        .route("/api/v1/", get(welcome))
        .route(
            "/api/v1/data/upload/:project_id",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/data/process/:project_id", post(process))
        .with_state(state)
}

async fn welcome<S: PipelineApi>(State(state): State<AppState<S>>) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!(
            "Welcome from {} {}!",
            state.config.app_name, state.config.app_version
        )
    }))
}

async fn upload<S: PipelineApi>(
    State(state): State<AppState<S>>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::warn!(error = %err, "Failed to read multipart request");
        ApiError {
            status: StatusCode::BAD_REQUEST,
            signal: ResponseSignal::FileUploadFailed,
        }
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .map_err(|err| UploadError::Stream(err.to_string()))
            .boxed();

        let stored = state
            .service
            .store_upload(
                &project_id,
                UploadRequest {
                    file_name,
                    content_type,
                    body,
                },
            )
            .await
            .map_err(upload_error)?;

        return Ok(Json(json!({
            "signal": ResponseSignal::FileUploadSuccess.as_str(),
            "file_id": stored.file_id,
            "project_id": project_id,
        })));
    }

    // No `file` part in the request.
    Err(ApiError {
        status: StatusCode::BAD_REQUEST,
        signal: ResponseSignal::FileUploadFailed,
    })
}

async fn process<S: PipelineApi>(
    State(state): State<AppState<S>>,
    Path(project_id): Path<String>,
    Json(options): Json<ProcessOptions>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .service
        .process_project(&project_id, options)
        .await
        .map_err(process_error)?;

    Ok(Json(json!({
        "signal": ResponseSignal::ProcessingSuccess.as_str(),
        "chunks": outcome.inserted_chunks,
        "files": outcome.processed_files,
    })))
}

fn upload_error(error: PipelineError) -> ApiError {
    let (status, signal) = match &error {
        PipelineError::InvalidProjectId => {
            (StatusCode::BAD_REQUEST, ResponseSignal::ProjectIdInvalid)
        }
        PipelineError::Upload(UploadError::TypeNotAllowed(_)) => {
            (StatusCode::BAD_REQUEST, ResponseSignal::FileTypeNotSupported)
        }
        PipelineError::Upload(UploadError::TooLarge { .. }) => {
            (StatusCode::BAD_REQUEST, ResponseSignal::FileSizeTooLarge)
        }
        PipelineError::Store(StoreError::Duplicate { .. }) => {
            (StatusCode::BAD_REQUEST, ResponseSignal::FileAlreadyExists)
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ResponseSignal::FileUploadFailed,
        ),
    };
    if status.is_server_error() {
        tracing::error!(error = %error, "Upload failed");
    } else {
        tracing::warn!(error = %error, "Upload rejected");
    }
    ApiError { status, signal }
}

fn process_error(error: PipelineError) -> ApiError {
    let (status, signal) = match &error {
        PipelineError::InvalidProjectId => {
            (StatusCode::BAD_REQUEST, ResponseSignal::ProjectIdInvalid)
        }
        PipelineError::NoFiles => (StatusCode::BAD_REQUEST, ResponseSignal::NoFilesFound),
        PipelineError::FileIdNotFound(_) => {
            (StatusCode::BAD_REQUEST, ResponseSignal::FileIdNotFound)
        }
        PipelineError::NoChunksProduced | PipelineError::Chunking(_) => {
            (StatusCode::BAD_REQUEST, ResponseSignal::ProcessingFailed)
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ResponseSignal::ProcessingFailed,
        ),
    };
    if status.is_server_error() {
        tracing::error!(error = %error, "Processing failed");
    } else {
        tracing::warn!(error = %error, "Processing rejected");
    }
    ApiError { status, signal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LlmBackend};
    use crate::processing::{ProcessOutcome, StoredUpload};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct StubPipeline {
        upload: Mutex<Option<Result<StoredUpload, PipelineError>>>,
        process: Mutex<Option<Result<ProcessOutcome, PipelineError>>>,
        seen_options: Mutex<Option<ProcessOptions>>,
    }

    impl StubPipeline {
        fn uploading(result: Result<StoredUpload, PipelineError>) -> Self {
            Self {
                upload: Mutex::new(Some(result)),
                process: Mutex::new(None),
                seen_options: Mutex::new(None),
            }
        }

        fn processing(result: Result<ProcessOutcome, PipelineError>) -> Self {
            Self {
                upload: Mutex::new(None),
                process: Mutex::new(Some(result)),
                seen_options: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn store_upload<'a>(
            &self,
            _project_id: &str,
            mut upload: UploadRequest<'a>,
        ) -> Result<StoredUpload, PipelineError> {
            while upload.body.next().await.is_some() {}
            self.upload.lock().unwrap().take().unwrap()
        }

        async fn process_project(
            &self,
            _project_id: &str,
            options: ProcessOptions,
        ) -> Result<ProcessOutcome, PipelineError> {
            *self.seen_options.lock().unwrap() = Some(options);
            self.process.lock().unwrap().take().unwrap()
        }
    }

    fn test_config() -> Config {
        Config {
            app_name: "ragpipe".into(),
            app_version: "0.1.0".into(),
            file_allowed_types: vec!["text/plain".into(), "application/pdf".into()],
            file_max_size_mb: 10,
            file_chunk_size: 512 * 1024,
            files_dir: PathBuf::from("assets/files"),
            mongodb_url: "mongodb://localhost:27017".into(),
            mongodb_database: "ragpipe".into(),
            generation_backend: LlmBackend::OpenAi,
            embedding_backend: LlmBackend::OpenAi,
            openai_api_key: Some("test-key".into()),
            openai_api_url: None,
            cohere_api_key: None,
            generation_model_id: Some("gpt-4o-mini".into()),
            embedding_model_id: Some("text-embedding-3-small".into()),
            embedding_model_size: Some(1536),
            input_max_characters: 1000,
            generation_max_tokens: 1000,
            generation_temperature: 0.1,
            server_port: None,
        }
    }

    fn router(stub: StubPipeline) -> Router {
        let config = Arc::new(test_config());
        let generation: Arc<dyn LlmClient> =
            Arc::from(crate::llm::build_generation_client(&config).unwrap());
        let embedding: Arc<dyn LlmClient> =
            Arc::from(crate::llm::build_embedding_client(&config).unwrap());
        create_router(AppState::new(config, Arc::new(stub), generation, embedding))
    }

    async fn response_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_upload(project_id: &str, field_name: &str) -> Request<Body> {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field_name}\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello world\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/data/upload/{project_id}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn welcome_reports_app_identity() {
        let app = router(StubPipeline::processing(Err(PipelineError::NoFiles)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Welcome from ragpipe 0.1.0!");
    }

    #[tokio::test]
    async fn upload_stores_the_file_part() {
        let app = router(StubPipeline::uploading(Ok(StoredUpload {
            file_id: "notes.txt".into(),
            size_bytes: 11,
        })));
        let response = app
            .oneshot(multipart_upload("project1", "file"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["signal"], "File uploaded successfully");
        assert_eq!(body["file_id"], "notes.txt");
        assert_eq!(body["project_id"], "project1");
    }

    #[tokio::test]
    async fn upload_without_file_part_is_rejected() {
        let app = router(StubPipeline::uploading(Ok(StoredUpload {
            file_id: "unused".into(),
            size_bytes: 0,
        })));
        let response = app
            .oneshot(multipart_upload("project1", "attachment"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["signal"], "File uploaded failed");
    }

    #[tokio::test]
    async fn upload_signals_follow_the_pipeline_error() {
        let cases = [
            (
                PipelineError::Upload(UploadError::TypeNotAllowed(Some("image/png".into()))),
                StatusCode::BAD_REQUEST,
                "File type not supported",
            ),
            (
                PipelineError::Upload(UploadError::TooLarge {
                    limit_bytes: 10 * 1024 * 1024,
                }),
                StatusCode::BAD_REQUEST,
                "File size too large",
            ),
            (
                PipelineError::Store(StoreError::Duplicate {
                    collection: "assets",
                }),
                StatusCode::BAD_REQUEST,
                "File already exists",
            ),
            (
                PipelineError::InvalidProjectId,
                StatusCode::BAD_REQUEST,
                "Project id must be alphanumeric",
            ),
            (
                PipelineError::Upload(UploadError::Stream("connection reset".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "File uploaded failed",
            ),
        ];

        for (error, expected_status, expected_signal) in cases {
            let app = router(StubPipeline::uploading(Err(error)));
            let response = app
                .oneshot(multipart_upload("project1", "file"))
                .await
                .unwrap();
            assert_eq!(response.status(), expected_status);
            let body = response_json(response).await;
            assert_eq!(body["signal"], expected_signal);
        }
    }

    #[tokio::test]
    async fn process_fills_defaults_from_an_empty_body() {
        let stub = StubPipeline::processing(Ok(ProcessOutcome {
            inserted_chunks: 7,
            processed_files: 2,
        }));
        let app = router(stub);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/data/process/project1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["signal"], "Processing success");
        assert_eq!(body["chunks"], 7);
        assert_eq!(body["files"], 2);
    }

    #[tokio::test]
    async fn process_forwards_explicit_options() {
        let app_state_stub = StubPipeline::processing(Ok(ProcessOutcome {
            inserted_chunks: 1,
            processed_files: 1,
        }));
        let seen = Arc::new(app_state_stub);
        let config = Arc::new(test_config());
        let generation: Arc<dyn LlmClient> =
            Arc::from(crate::llm::build_generation_client(&config).unwrap());
        let embedding: Arc<dyn LlmClient> =
            Arc::from(crate::llm::build_embedding_client(&config).unwrap());
        let app = create_router(AppState::new(
            config,
            seen.clone(),
            generation,
            embedding,
        ));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/data/process/project1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"file_id": "notes.txt", "chunk_size": 300, "overlap_size": 50, "do_reset": 1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let options = seen.seen_options.lock().unwrap().take().unwrap();
        assert_eq!(options.file_id.as_deref(), Some("notes.txt"));
        assert_eq!(options.chunk_size, 300);
        assert_eq!(options.overlap_size, 50);
        assert_eq!(options.do_reset, 1);
    }

    #[tokio::test]
    async fn process_signals_follow_the_pipeline_error() {
        let cases = [
            (
                PipelineError::NoFiles,
                StatusCode::BAD_REQUEST,
                "No files found",
            ),
            (
                PipelineError::FileIdNotFound("missing.txt".into()),
                StatusCode::BAD_REQUEST,
                "File id not found",
            ),
            (
                PipelineError::NoChunksProduced,
                StatusCode::BAD_REQUEST,
                "Processing failed",
            ),
            (
                PipelineError::Store(StoreError::MissingId {
                    collection: "projects",
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
            ),
        ];

        for (error, expected_status, expected_signal) in cases {
            let app = router(StubPipeline::processing(Err(error)));
            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/data/process/project1")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected_status);
            let body = response_json(response).await;
            assert_eq!(body["signal"], expected_signal);
        }
    }
}
