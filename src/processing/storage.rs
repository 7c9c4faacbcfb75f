//! On-disk storage for uploaded files.
//!
//! Uploads land under a per-project directory with a collision-resistant
//! generated filename. Writes are streamed and size-capped; a failed write
//! leaves no file behind.

use crate::processing::types::UploadError;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

/// Strip a client filename down to alphanumerics, underscores, and dots.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'))
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Generate a collision-resistant on-disk name for an upload.
pub fn unique_filename(original: &str) -> String {
    format!(
        "{}_{}",
        Uuid::new_v4().simple(),
        sanitize_filename(original)
    )
}

/// Directory holding a project's stored files.
pub fn project_dir(base: &Path, project_id: &str) -> PathBuf {
    base.join(project_id)
}

/// Stream an upload to `path`, enforcing `limit_bytes` as the bytes arrive.
///
/// Multipart bodies carry no trusted length up front, so the cap is applied
/// mid-stream. Writes go through a buffer of `buffer_bytes` capacity. On any
/// failure the partial file is removed before the error is returned. Returns
/// the number of bytes written.
pub async fn write_stream<S>(
    path: &Path,
    mut body: S,
    limit_bytes: u64,
    buffer_bytes: usize,
) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, UploadError>> + Unpin,
{
    let mut file = BufWriter::with_capacity(buffer_bytes.max(1), fs::File::create(path).await?);
    let mut written: u64 = 0;

    let outcome = async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > limit_bytes {
                return Err(UploadError::TooLarge { limit_bytes });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => Ok(written),
        Err(err) => {
            remove_quietly(path).await;
            Err(err)
        }
    }
}

/// Best-effort file removal; failures are logged, not propagated.
pub async fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        tracing::debug!(path = %path.display(), error = %err, "Failed to remove file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;

    fn body(chunks: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, UploadError>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn sanitize_keeps_word_characters_and_dots() {
        assert_eq!(sanitize_filename(" my report (v2).pdf "), "myreportv2.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_filename("notes_final.txt"), "notes_final.txt");
        assert_eq!(sanitize_filename("???"), "upload");
    }

    #[test]
    fn unique_filenames_differ_for_the_same_input() {
        let first = unique_filename("report.pdf");
        let second = unique_filename("report.pdf");
        assert_ne!(first, second);
        assert!(first.ends_with("_report.pdf"));
    }

    #[tokio::test]
    async fn streamed_write_persists_all_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stored.txt");
        let written = write_stream(&path, body(vec![b"hello ", b"world"]), 1024, 8192)
            .await
            .unwrap();
        assert_eq!(written, 11);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn oversized_upload_aborts_and_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stored.txt");
        let error = write_stream(&path, body(vec![b"hello ", b"world"]), 8, 8192)
            .await
            .unwrap_err();
        assert!(matches!(error, UploadError::TooLarge { limit_bytes: 8 }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stream_failure_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stored.txt");
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(UploadError::Stream("connection reset".into())),
        ]);
        let error = write_stream(&path, failing, 1024, 8192).await.unwrap_err();
        assert!(matches!(error, UploadError::Stream(_)));
        assert!(!path.exists());
    }
}
