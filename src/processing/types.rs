//! Core data types and error definitions for the ingestion pipeline.

use crate::db::StoreError;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use mongodb::bson::Document;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// One page (or whole-file record) produced by the content loader.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Raw text of the record.
    pub text: String,
    /// Metadata attached to every window split from this record.
    pub metadata: Document,
}

/// One overlapping text window produced by the splitter.
#[derive(Debug, Clone)]
pub struct TextWindow {
    /// Window text.
    pub text: String,
    /// Metadata inherited from the source record.
    pub metadata: Document,
}

/// A multipart upload handed to the pipeline by the HTTP layer.
pub struct UploadRequest<'a> {
    /// Original client filename.
    pub file_name: String,
    /// MIME type declared by the client, if any.
    pub content_type: Option<String>,
    /// Streamed file contents.
    pub body: BoxStream<'a, Result<Bytes, UploadError>>,
}

/// Result of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Identifier the client uses to refer to the file in later requests.
    pub file_id: String,
    /// Number of bytes written to disk.
    pub size_bytes: u64,
}

/// Options accepted by the processing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessOptions {
    /// Process only the asset with this name; `None` processes every file asset.
    #[serde(default)]
    pub file_id: Option<String>,
    /// Target window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between adjacent windows.
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
    /// When `1`, wipe all existing project chunks before inserting new ones.
    #[serde(default)]
    pub do_reset: u8,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            file_id: None,
            chunk_size: default_chunk_size(),
            overlap_size: default_overlap_size(),
            do_reset: 0,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap_size() -> usize {
    20
}

/// Aggregate totals for a completed processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Total chunks inserted across all processed files.
    pub inserted_chunks: usize,
    /// Number of files that produced chunks.
    pub processed_files: usize,
}

/// Errors raised while validating and storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// MIME type missing from, or not on, the configured allow-list.
    #[error("file type {0:?} is not allowed")]
    TypeNotAllowed(Option<String>),
    /// Upload exceeded the configured size limit.
    #[error("file exceeds the maximum size of {limit_bytes} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit_bytes: u64,
    },
    /// Reading the multipart stream failed.
    #[error("failed to read upload stream: {0}")]
    Stream(String),
    /// Writing the file to disk failed.
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the content loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The stored file is gone from disk.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file extension maps to no known reader.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    /// Reading the file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// PDF text extraction failed.
    #[error("failed to extract text from {}: {detail}", path.display())]
    Pdf {
        /// File that failed to parse.
        path: PathBuf,
        /// Extraction failure reported by the PDF library.
        detail: String,
    },
}

/// Errors raised while splitting records into windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Window size of zero makes no progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new content in every window.
    #[error("overlap of {overlap} does not fit a chunk size of {chunk_size}")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested window size in characters.
        chunk_size: usize,
    },
}

/// Errors emitted by the ingestion pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Project id failed the alphanumeric-only invariant.
    #[error("project id must be alphanumeric")]
    InvalidProjectId,
    /// Upload validation or storage failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// The project has no file assets to process.
    #[error("project has no files to process")]
    NoFiles,
    /// The named file id matches no asset in the project.
    #[error("no file found with id `{0}`")]
    FileIdNotFound(String),
    /// The processing pass produced no chunks at all.
    #[error("processing produced no chunks")]
    NoChunksProduced,
    /// Splitter configuration was rejected.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
