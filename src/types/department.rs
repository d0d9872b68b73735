//! Departments and charge items

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub his_code: String,
    pub his_name: String,
    #[serde(default)]
    pub cost_center_code: Option<String>,
    #[serde(default)]
    pub cost_center_name: Option<String>,
    #[serde(default)]
    pub accounting_unit_code: Option<String>,
    #[serde(default)]
    pub accounting_unit_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DepartmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub his_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub his_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounting_unit_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounting_unit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DepartmentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortDirection>,
}

/// Response of the evaluation toggle
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EvaluationToggle {
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeItem {
    pub id: i64,
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChargeItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChargeItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_category: Option<String>,
}
