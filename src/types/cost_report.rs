//! Department cost reports

use serde::{Deserialize, Serialize};

use super::common::lenient_f64;
use super::import::{PreviewRow, PreviewStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    /// `YYYY-MM`
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub personnel_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub material_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub medicine_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub depreciation_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub other_cost: f64,
}

impl CostReport {
    pub fn total_cost(&self) -> f64 {
        self.personnel_cost + self.material_cost + self.medicine_cost + self.depreciation_cost + self.other_cost
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostReportCreate {
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    pub personnel_cost: f64,
    pub material_cost: f64,
    pub medicine_cost: f64,
    pub depreciation_cost: f64,
    pub other_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personnel_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_cost: Option<f64>,
}

/// Filter for listing and for filtered clearing
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReportPreviewItem {
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    #[serde(default)]
    pub excel_department_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub personnel_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub material_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub medicine_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub depreciation_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub other_cost: f64,
    pub status: PreviewStatus,
    #[serde(default)]
    pub message: String,
}

impl PreviewRow for CostReportPreviewItem {
    fn status(&self) -> PreviewStatus {
        self.status
    }
}
