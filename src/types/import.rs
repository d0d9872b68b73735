//! Wire types shared by every staged import
//!
//! Each import domain reuses the parse/extract shapes and brings its own
//! value-mapping, preview-item and statistics types (see the domain modules).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::lenient_opt_f64;

/// Target field -> source column header
pub type FieldMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Exact match on entity code
    #[default]
    Code,
    /// Fuzzy match on entity name
    Name,
}

impl std::str::FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(MatchStrategy::Code),
            "name" => Ok(MatchStrategy::Name),
            other => Err(format!("unknown match strategy: {}", other)),
        }
    }
}

/// Options for the parse stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOptions {
    pub sheet_name: Option<String>,
    pub skip_rows: Option<u32>,
    /// 1-based; defaults server-side to `skip_rows + 1`
    pub header_row: Option<u32>,
}

/// Spreadsheet handed to the parse stage
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    pub session_id: String,
    #[serde(default)]
    pub sheet_names: Vec<String>,
    #[serde(default)]
    pub current_sheet: Option<String>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub preview_data: Vec<Vec<Value>>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub skip_rows: u32,
    #[serde(default)]
    pub header_row: Option<u32>,
    #[serde(default)]
    pub suggested_mapping: FieldMapping,
}

/// System entity a source value can be mapped to (department, dimension, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub full_path: Option<String>,
    /// Similarity, 0-1 or 0-100 depending on the domain
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub score: Option<f64>,
}

/// Distinct source value with ranked candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueMatch {
    pub value: String,
    /// Source column the value came from, when a domain reads several
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(
        default,
        alias = "suggested_departments",
        alias = "suggested_dimensions",
        alias = "suggested_entities"
    )]
    pub candidates: Vec<EntityCandidate>,
}

impl UniqueValueMatch {
    /// Top-ranked candidate, if any.
    pub fn best_candidate(&self) -> Option<&EntityCandidate> {
        self.candidates.iter().max_by(|a, b| {
            a.score
                .unwrap_or(0.0)
                .partial_cmp(&b.score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Candidate whose code or name equals the source value exactly.
    pub fn exact_match(&self) -> Option<&EntityCandidate> {
        let value = self.value.trim();
        self.candidates
            .iter()
            .find(|c| c.code == value || c.name == value)
    }

    /// Candidate safe to pick without asking: the exact match, or the only
    /// candidate there is.
    pub fn unambiguous_candidate(&self) -> Option<&EntityCandidate> {
        match self.candidates.as_slice() {
            [only] => Some(only),
            _ => self.exact_match(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub unique_values: Vec<UniqueValueMatch>,
    #[serde(
        default,
        alias = "system_departments",
        alias = "system_dimensions",
        alias = "system_entities"
    )]
    pub candidate_entities: Vec<EntityCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStatus {
    New,
    Update,
    Skip,
    Error,
    /// Dimension-item domain
    Ok,
    /// Dimension-item domain
    Warning,
}

impl PreviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewStatus::New => "new",
            PreviewStatus::Update => "update",
            PreviewStatus::Skip => "skip",
            PreviewStatus::Error => "error",
            PreviewStatus::Ok => "ok",
            PreviewStatus::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse<I, S> {
    pub preview_items: Vec<I>,
    pub statistics: S,
}

/// `new/update/skip/error` counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatistics {
    pub total: u64,
    #[serde(default)]
    pub new_count: u64,
    #[serde(default)]
    pub update_count: u64,
    #[serde(default)]
    pub skip_count: u64,
    #[serde(default)]
    pub error_count: u64,
}

/// `ok/warning/error` counters of the dimension-item domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionPreviewStatistics {
    pub total: u64,
    #[serde(default)]
    pub ok: u64,
    #[serde(default)]
    pub warning: u64,
    #[serde(default)]
    pub error: u64,
}

/// Row that failed during execute: identifying key columns plus reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    #[serde(flatten)]
    pub key: BTreeMap<String, Value>,
    pub reason: String,
}

impl RowError {
    /// Key columns rendered as `k=v` pairs.
    pub fn key_label(&self) -> String {
        self.key
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub update_count: u64,
    #[serde(default, alias = "skipped_count")]
    pub skip_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub report: ImportReport,
}

// ============================================================================
// Per-domain contracts used by the wizard
// ============================================================================

/// User decision for one unique value
pub trait ValueMapping {
    /// Source value the mapping refers to
    fn value(&self) -> &str;

    /// Source column, for domains whose unique values are keyed by column
    fn source(&self) -> Option<&str> {
        None
    }
}

pub trait PreviewRow {
    fn status(&self) -> PreviewStatus;
}

/// Statistics block whose total must equal the sum of its categories
pub trait PreviewTally {
    fn total(&self) -> u64;

    /// `None` when the categories overflow `u64`
    fn category_sum(&self) -> Option<u64>;

    fn is_consistent(&self) -> bool {
        self.category_sum() == Some(self.total())
    }
}

impl PreviewTally for ImportStatistics {
    fn total(&self) -> u64 {
        self.total
    }

    fn category_sum(&self) -> Option<u64> {
        self.new_count
            .checked_add(self.update_count)?
            .checked_add(self.skip_count)?
            .checked_add(self.error_count)
    }
}

impl PreviewTally for DimensionPreviewStatistics {
    fn total(&self) -> u64 {
        self.total
    }

    fn category_sum(&self) -> Option<u64> {
        self.ok.checked_add(self.warning)?.checked_add(self.error)
    }
}

/// Department choice used by the cost-report and reference-value imports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentValueMapping {
    pub value: String,
    /// `None` skips every row carrying this value
    pub department_code: Option<String>,
}

impl ValueMapping for DepartmentValueMapping {
    fn value(&self) -> &str {
        &self.value
    }
}

/// Dimension choice used by the dimension-item import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValueMapping {
    pub value: String,
    pub source: String,
    /// Empty skips the value
    pub dimension_codes: Vec<String>,
}

impl ValueMapping for DimensionValueMapping {
    fn value(&self) -> &str {
        &self.value
    }

    fn source(&self) -> Option<&str> {
        Some(&self.source)
    }
}

/// Keep-or-drop choice for one data template table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValueMapping {
    pub value: String,
    /// `None` leaves the table out of the batch
    pub entity_code: Option<String>,
}

impl ValueMapping for EntityValueMapping {
    fn value(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_response_accepts_domain_aliases() {
        let departments: ExtractResponse = serde_json::from_value(json!({
            "unique_values": [{"value": "内科", "count": 3, "suggested_departments": [
                {"id": 1, "code": "NK", "name": "内科", "score": 1.0},
                {"id": 2, "code": "NK2", "name": "内科二病区", "score": 0.6}
            ]}],
            "system_departments": [{"id": 1, "code": "NK", "name": "内科"}]
        }))
        .unwrap();
        assert_eq!(departments.unique_values[0].candidates.len(), 2);
        assert_eq!(departments.candidate_entities.len(), 1);
        assert_eq!(departments.unique_values[0].exact_match().unwrap().code, "NK");

        let dimensions: ExtractResponse = serde_json::from_value(json!({
            "unique_values": [{"value": "检查", "source": "收费类别", "count": 10, "suggested_dimensions": [
                {"id": 9, "code": "D01", "name": "检查", "full_path": "医技/检查", "score": 92}
            ]}],
            "system_dimensions": []
        }))
        .unwrap();
        let value = &dimensions.unique_values[0];
        assert_eq!(value.source.as_deref(), Some("收费类别"));
        assert_eq!(value.best_candidate().unwrap().score, Some(92.0));
    }

    #[test]
    fn test_unambiguous_candidate_needs_exact_or_sole_match() {
        let value: UniqueValueMatch = serde_json::from_value(json!({
            "value": "内科", "count": 2, "suggested_departments": [
                {"id": 2, "code": "0102", "name": "内科一病区", "score": 0.6},
                {"id": 3, "code": "0103", "name": "内科二病区", "score": 0.5}
            ]
        }))
        .unwrap();
        assert_eq!(value.best_candidate().unwrap().code, "0102");
        assert_eq!(value.unambiguous_candidate(), None);

        let sole: UniqueValueMatch = serde_json::from_value(json!({
            "value": "心内", "suggested_departments": [{"id": 1, "code": "0101", "name": "心内科", "score": 0.7}]
        }))
        .unwrap();
        assert_eq!(sole.unambiguous_candidate().unwrap().code, "0101");
    }

    #[test]
    fn test_statistics_tally() {
        let ok = ImportStatistics {
            total: 3,
            new_count: 1,
            update_count: 1,
            skip_count: 1,
            error_count: 0,
        };
        assert!(ok.is_consistent());

        let bad = DimensionPreviewStatistics {
            total: 5,
            ok: 2,
            warning: 1,
            error: 1,
        };
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_overflowing_statistics_are_inconsistent() {
        let stats = ImportStatistics {
            total: 5,
            new_count: u64::MAX,
            update_count: 6,
            skip_count: 0,
            error_count: 0,
        };
        assert_eq!(stats.category_sum(), None);
        assert!(!stats.is_consistent());

        let dims = DimensionPreviewStatistics {
            total: 1,
            ok: 1,
            warning: u64::MAX,
            error: 0,
        };
        assert!(!dims.is_consistent());
    }

    #[test]
    fn test_import_report_row_errors_keep_key_columns() {
        let report: ImportReport = serde_json::from_value(json!({
            "success_count": 10,
            "skipped_count": 2,
            "error_count": 1,
            "errors": [{"item_code": "X01", "dimension_code": "D9", "reason": "维度不存在"}]
        }))
        .unwrap();
        assert_eq!(report.skip_count, 2);
        assert_eq!(report.update_count, 0);
        assert_eq!(report.errors[0].reason, "维度不存在");
        assert_eq!(report.errors[0].key_label(), "dimension_code=D9, item_code=X01");
    }
}
