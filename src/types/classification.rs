//! AI-assisted charge item classification: tasks, plans, plan items

use serde::{Deserialize, Serialize};

use super::common::lenient_opt_f64;
use super::import::{PreviewRow, PreviewStatus, ValueMapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassificationTask {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub task_name: String,
    pub model_version_id: i64,
    #[serde(default)]
    pub charge_categories: Vec<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub processed_items: u64,
    #[serde(default)]
    pub failed_items: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationTaskCreate {
    pub task_name: String,
    pub model_version_id: i64,
    pub charge_categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskProgress {
    pub task_id: i64,
    pub status: String,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub processed_items: u64,
    #[serde(default)]
    pub failed_items: u64,
    #[serde(default)]
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskLog {
    pub id: i64,
    pub task_id: i64,
    pub charge_item_id: i64,
    #[serde(default)]
    pub charge_item_name: String,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskItems {
    #[serde(default)]
    pub items: Vec<ClassificationTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskLogs {
    #[serde(default)]
    pub logs: Vec<TaskLog>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassificationPlan {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub task_id: i64,
    #[serde(default)]
    pub plan_name: Option<String>,
    /// `draft` or `submitted`
    pub status: String,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub model_version_id: Option<i64>,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub adjusted_items: u64,
    #[serde(default)]
    pub low_confidence_items: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanItem {
    pub id: i64,
    pub plan_id: i64,
    pub charge_item_id: i64,
    pub charge_item_name: String,
    #[serde(default)]
    pub charge_item_code: Option<String>,
    #[serde(default)]
    pub charge_item_category: Option<String>,
    #[serde(default)]
    pub ai_suggested_dimension_id: Option<i64>,
    #[serde(default)]
    pub ai_suggested_dimension_name: Option<String>,
    #[serde(default)]
    pub ai_suggested_dimension_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub user_set_dimension_id: Option<i64>,
    #[serde(default)]
    pub user_set_dimension_name: Option<String>,
    #[serde(default)]
    pub is_adjusted: bool,
    /// User choice, else the AI suggestion
    #[serde(default)]
    pub final_dimension_id: Option<i64>,
    #[serde(default)]
    pub final_dimension_name: Option<String>,
    #[serde(default)]
    pub final_dimension_path: Option<String>,
    #[serde(default)]
    pub processing_status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_adjusted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPreviewItem {
    pub item_id: i64,
    pub item_name: String,
    pub dimension_id: i64,
    pub dimension_name: String,
    #[serde(default)]
    pub dimension_path: String,
    #[serde(default)]
    pub old_dimension_name: Option<String>,
    #[serde(default)]
    pub old_dimension_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPreview {
    pub plan_id: i64,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub new_count: u64,
    #[serde(default)]
    pub overwrite_count: u64,
    #[serde(default)]
    pub new_items: Vec<SubmitPreviewItem>,
    #[serde(default)]
    pub overwrite_items: Vec<SubmitPreviewItem>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One plan item as it would be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationPreviewItem {
    pub item_id: i64,
    pub charge_item_name: String,
    #[serde(default)]
    pub dimension_id: Option<i64>,
    #[serde(default)]
    pub dimension_name: Option<String>,
    #[serde(default)]
    pub dimension_path: Option<String>,
    /// Mapping that submitting overwrites
    #[serde(default)]
    pub old_dimension_name: Option<String>,
    pub status: PreviewStatus,
    #[serde(default)]
    pub message: String,
}

impl PreviewRow for ClassificationPreviewItem {
    fn status(&self) -> PreviewStatus {
        self.status
    }
}

/// Dimension decision for one plan item
///
/// `value` is the charge item name shown to the user, `source` the plan
/// item id; `dimension_id: None` leaves the item unclassified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItemMapping {
    pub value: String,
    pub source: String,
    pub dimension_id: Option<i64>,
}

impl PlanItemMapping {
    pub fn item_id(&self) -> Option<i64> {
        self.source.parse().ok()
    }
}

impl ValueMapping for PlanItemMapping {
    fn value(&self) -> &str {
        &self.value
    }

    fn source(&self) -> Option<&str> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationTaskUpdate {
    pub task_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

/// `dimension_id: None` skips the item on submit
#[derive(Debug, Clone, Serialize)]
pub struct PlanItemUpdate {
    pub dimension_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub new_count: u64,
    #[serde(default)]
    pub overwrite_count: u64,
    #[serde(default)]
    pub submitted_at: Option<String>,
}
