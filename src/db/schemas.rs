//! BSON document schemas and index declarations for the three collections.

use mongodb::IndexModel;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

/// Collection holding project records.
pub const PROJECTS_COLLECTION: &str = "projects";
/// Collection holding asset records.
pub const ASSETS_COLLECTION: &str = "assets";
/// Collection holding data chunk records.
pub const CHUNKS_COLLECTION: &str = "chunks";

/// `asset_type` value recorded for uploaded files.
pub const ASSET_TYPE_FILE: &str = "file";
/// `asset_config` key holding the generated on-disk filename.
pub const ASSET_CONFIG_STORED_NAME: &str = "stored_name";

/// A project groups uploaded assets and their chunks under a user-facing id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// MongoDB object id.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// User-facing identifier; alphanumeric only, unique across projects.
    pub project_id: String,
}

impl Project {
    /// Build an unsaved project record. The caller is responsible for having
    /// validated the identifier with [`valid_project_id`].
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id: project_id.into(),
        }
    }

    /// Indexes declared on the projects collection.
    pub fn indexes() -> Vec<IndexModel> {
        vec![
            IndexModel::builder()
                .keys(doc! { "project_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("project_id_index_1".to_string())
                        .build(),
                )
                .build(),
        ]
    }
}

/// Whether a candidate project identifier satisfies the alphanumeric-only invariant.
pub fn valid_project_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

/// One record per uploaded file, owned by a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// MongoDB object id.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Object id of the owning project.
    pub asset_project_id: ObjectId,
    /// Kind of asset; uploads use [`ASSET_TYPE_FILE`].
    pub asset_type: String,
    /// Client-facing name, unique within the project.
    pub asset_name: String,
    /// Size of the stored file in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_size: Option<i64>,
    /// When the asset was uploaded.
    pub asset_pushed_at: DateTime,
    /// Free-form per-asset settings, e.g. the generated on-disk filename.
    #[serde(default)]
    pub asset_config: Document,
}

impl Asset {
    /// Build an unsaved asset record for a freshly stored upload.
    pub fn new_file(
        project_id: ObjectId,
        asset_name: impl Into<String>,
        size_bytes: u64,
        stored_name: &str,
    ) -> Self {
        Self {
            id: None,
            asset_project_id: project_id,
            asset_type: ASSET_TYPE_FILE.to_string(),
            asset_name: asset_name.into(),
            asset_size: Some(size_bytes as i64),
            asset_pushed_at: DateTime::now(),
            asset_config: doc! { ASSET_CONFIG_STORED_NAME: stored_name },
        }
    }

    /// Filename of the stored file on disk.
    ///
    /// Falls back to `asset_name` for records written before the stored name
    /// was tracked separately.
    pub fn stored_name(&self) -> &str {
        self.asset_config
            .get_str(ASSET_CONFIG_STORED_NAME)
            .unwrap_or(&self.asset_name)
    }

    /// Indexes declared on the assets collection.
    pub fn indexes() -> Vec<IndexModel> {
        vec![
            IndexModel::builder()
                .keys(doc! { "asset_project_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("asset_project_id_index_1".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "asset_project_id": 1, "asset_name": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("asset_project_id_asset_name_index_1".to_string())
                        .build(),
                )
                .build(),
        ]
    }
}

/// One text window produced by the splitter; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChunk {
    /// MongoDB object id.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Window text content.
    pub chunk_text: String,
    /// Metadata carried over from the source record (source name, page number).
    pub chunk_metadata: Document,
    /// 1-based position of the window within its asset.
    pub chunk_order: i64,
    /// Object id of the owning project.
    pub chunk_project_id: ObjectId,
    /// Object id of the asset the window was split from.
    pub chunk_asset_id: ObjectId,
}

impl DataChunk {
    /// Indexes declared on the chunks collection.
    pub fn indexes() -> Vec<IndexModel> {
        vec![
            IndexModel::builder()
                .keys(doc! { "chunk_project_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("chunk_project_id_index_1".to_string())
                        .build(),
                )
                .build(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_validation_rejects_non_alphanumeric() {
        assert!(valid_project_id("project1"));
        assert!(valid_project_id("42"));
        assert!(!valid_project_id(""));
        assert!(!valid_project_id("my-project"));
        assert!(!valid_project_id("proj ect"));
        assert!(!valid_project_id("../etc"));
    }

    #[test]
    fn asset_unique_index_covers_project_and_name() {
        let indexes = Asset::indexes();
        let unique = indexes
            .iter()
            .find(|index| {
                index
                    .options
                    .as_ref()
                    .and_then(|options| options.unique)
                    .unwrap_or(false)
            })
            .expect("assets declare a unique index");
        assert!(unique.keys.contains_key("asset_project_id"));
        assert!(unique.keys.contains_key("asset_name"));
    }

    #[test]
    fn stored_name_falls_back_to_asset_name() {
        let mut asset = Asset::new_file(ObjectId::new(), "report.pdf", 10, "abc_report.pdf");
        assert_eq!(asset.stored_name(), "abc_report.pdf");
        asset.asset_config = Document::new();
        assert_eq!(asset.stored_name(), "report.pdf");
    }
}
