//! Data templates (table definitions + SQL per hospital)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::import::{PreviewRow, PreviewStatus, UploadFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTemplate {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub table_name: String,
    pub table_name_cn: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_core: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub definition_file_name: Option<String>,
    #[serde(default)]
    pub sql_file_name: Option<String>,
    #[serde(default)]
    pub has_definition: bool,
    #[serde(default)]
    pub has_sql: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataTemplateCreate {
    pub table_name: String,
    pub table_name_cn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_core: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataTemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name_cn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_core: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataTemplateQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_core: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_definition: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_sql: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchUploadItem {
    pub table_name: String,
    #[serde(default)]
    pub table_name_cn: Option<String>,
    #[serde(default)]
    pub definition_file_name: Option<String>,
    #[serde(default)]
    pub sql_file_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchUploadPreview {
    pub items: Vec<BatchUploadItem>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub matched: u64,
    #[serde(default)]
    pub partial: u64,
    #[serde(default)]
    pub unmatched: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub skipped_count: u64,
    #[serde(default)]
    pub details: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Skip,
    Overwrite,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyTemplatesRequest {
    pub source_hospital_id: i64,
    pub template_ids: Vec<i64>,
    pub conflict_strategy: ConflictStrategy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HospitalSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

fn default_true() -> bool {
    true
}

/// Files handed to a batch template import
///
/// Definition documents are named `中文名(TABLE_NAME).md`, SQL files
/// `TABLE_NAME.sql`; the server pairs them by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateFiles {
    pub definition_files: Vec<UploadFile>,
    pub sql_files: Vec<UploadFile>,
}

impl TemplateFiles {
    pub fn is_empty(&self) -> bool {
        self.definition_files.is_empty() && self.sql_files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definition_files.len() + self.sql_files.len()
    }
}

/// One table of a batch template import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTemplatePreviewItem {
    pub table_name: String,
    #[serde(default)]
    pub table_name_cn: Option<String>,
    #[serde(default)]
    pub definition_file_name: Option<String>,
    #[serde(default)]
    pub sql_file_name: Option<String>,
    pub status: PreviewStatus,
    #[serde(default)]
    pub message: String,
}

impl PreviewRow for DataTemplatePreviewItem {
    fn status(&self) -> PreviewStatus {
        self.status
    }
}
