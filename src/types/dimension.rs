//! Dimension item catalogue (charge items mapped onto model dimensions)

use serde::{Deserialize, Serialize};

use super::import::{PreviewRow, PreviewStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionItem {
    pub id: i64,
    pub dimension_id: i64,
    pub item_code: String,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionItemQuery {
    pub dimension_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl DimensionItemQuery {
    pub fn for_dimension(dimension_id: i64) -> Self {
        Self {
            dimension_id,
            keyword: None,
            page: None,
            size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionImportPreviewItem {
    pub item_code: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub dimension_code: String,
    #[serde(default)]
    pub dimension_name: String,
    #[serde(default)]
    pub dimension_path: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_value: String,
    pub status: PreviewStatus,
    #[serde(default)]
    pub message: String,
}

impl PreviewRow for DimensionImportPreviewItem {
    fn status(&self) -> PreviewStatus {
        self.status
    }
}
