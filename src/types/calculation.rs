//! Calculation workflows, steps and tasks

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::lenient_f64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculationWorkflow {
    pub id: i64,
    pub version_id: i64,
    #[serde(default)]
    pub version_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub step_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowCreate {
    pub version_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowCopy {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowCopyResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub step_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    Python,
    Sql,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculationStep {
    pub id: i64,
    pub workflow_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub code_type: CodeType,
    #[serde(default)]
    pub code_content: String,
    #[serde(default)]
    pub data_source_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct StepCreate {
    pub workflow_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code_type: CodeType,
    pub code_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_type: Option<CodeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

/// Ad-hoc code test without saving the step
#[derive(Debug, Clone, Serialize)]
pub struct CodeTestAdhoc {
    pub code_type: CodeType,
    pub code_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepTestResult {
    pub success: bool,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculationTaskCreate {
    pub model_version_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<i64>,
    /// All departments when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_ids: Option<Vec<i64>>,
    /// `YYYY-MM`
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculationTask {
    pub id: i64,
    pub task_id: String,
    pub model_version_id: i64,
    #[serde(default)]
    pub workflow_id: Option<i64>,
    pub period: String,
    pub status: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub progress: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CalculationTaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<i64>,
}
