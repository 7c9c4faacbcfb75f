//! Extension-dispatched content loading for stored files.
//!
//! Plain text and PDF are the only recognized formats. Text files load as a
//! single record; PDFs load one record per page with the page number attached
//! as metadata.

use crate::processing::types::{LoaderError, PageRecord};
use mongodb::bson::doc;
use std::path::Path;

/// File formats the loader can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// UTF-8 plain text (`.txt`).
    Text,
    /// PDF document (`.pdf`).
    Pdf,
}

impl FileKind {
    /// Select a reader from the filename extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Load the page/record sequence for a stored file.
pub async fn load_records(path: &Path) -> Result<Vec<PageRecord>, LoaderError> {
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_string();
    let kind = FileKind::from_name(&name)
        .ok_or_else(|| LoaderError::UnsupportedType(name.clone()))?;

    match tokio::fs::metadata(path).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }
        Err(err) => {
            return Err(LoaderError::Io {
                path: path.to_path_buf(),
                source: err,
            });
        }
    }

    match kind {
        FileKind::Text => load_text(path, &name).await,
        FileKind::Pdf => load_pdf(path, &name).await,
    }
}

async fn load_text(path: &Path, name: &str) -> Result<Vec<PageRecord>, LoaderError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(vec![PageRecord {
        text,
        metadata: doc! { "source": name },
    }])
}

async fn load_pdf(path: &Path, name: &str) -> Result<Vec<PageRecord>, LoaderError> {
    // pdf-extract is synchronous; keep it off the async workers.
    let owned = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
        .await
        .map_err(|err| LoaderError::Pdf {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?
        .map_err(|err| LoaderError::Pdf {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(index, text)| PageRecord {
            text,
            metadata: doc! { "source": name, "page": index as i64 },
        })
        .collect())
}
