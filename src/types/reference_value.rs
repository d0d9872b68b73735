//! Department reference values (benchmark value per period)

use serde::{Deserialize, Serialize};

use super::common::{lenient_f64, lenient_opt_f64};
use super::import::{PreviewRow, PreviewStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValue {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub reference_value: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub doctor_reference_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub nurse_reference_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub tech_reference_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceValueCreate {
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    pub reference_value: f64,
    pub doctor_reference_value: Option<f64>,
    pub nurse_reference_value: Option<f64>,
    pub tech_reference_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceValueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_reference_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurse_reference_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_reference_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceValueQuery {
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
pub struct ReferenceValuePreviewItem {
    pub period: String,
    pub department_code: String,
    pub department_name: String,
    #[serde(default)]
    pub excel_department_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub reference_value: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub doctor_reference_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub nurse_reference_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub tech_reference_value: Option<f64>,
    pub status: PreviewStatus,
    #[serde(default)]
    pub message: String,
}

impl PreviewRow for ReferenceValuePreviewItem {
    fn status(&self) -> PreviewStatus {
        self.status
    }
}
