//! Hospital types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HospitalQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HospitalCreate {
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HospitalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Response of `POST /hospitals/{id}/activate`
#[derive(Debug, Clone, Deserialize)]
pub struct HospitalActivation {
    pub hospital_id: i64,
    pub hospital_name: String,
    #[serde(default)]
    pub message: String,
}
