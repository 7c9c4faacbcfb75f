//! Document ingestion pipeline: upload storage, content loading, splitting,
//! and chunk persistence.

pub mod loader;
pub mod service;
pub mod splitter;
pub mod storage;
pub mod types;

pub use service::{PipelineApi, PipelineService};
pub use types::{
    ChunkingError, LoaderError, PageRecord, PipelineError, ProcessOptions, ProcessOutcome,
    StoredUpload, TextWindow, UploadError, UploadRequest,
};
