//! Spreadsheet import domains
//!
//! Each domain only names its endpoints, required fields and wire types.

use serde_json::{json, Map, Value};

use super::{ImportEndpoints, SpreadsheetImport};
use crate::types::{
    CostReportPreviewItem, DepartmentValueMapping, DimensionImportPreviewItem,
    DimensionPreviewStatistics, DimensionValueMapping, ImportStatistics, MatchStrategy,
    ReferenceValuePreviewItem,
};

/// Monthly department cost reports
#[derive(Debug, Clone, Copy, Default)]
pub struct CostReportImport;

impl SpreadsheetImport for CostReportImport {
    type Mapping = DepartmentValueMapping;
    type Item = CostReportPreviewItem;
    type Stats = ImportStatistics;

    fn name(&self) -> &str {
        "cost-reports"
    }

    fn endpoints(&self) -> ImportEndpoints {
        ImportEndpoints::under("/cost-reports/import")
    }

    fn required_fields(&self, _strategy: MatchStrategy) -> Vec<&'static str> {
        vec!["department_name"]
    }
}

/// Per-department reference values
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceValueImport;

impl SpreadsheetImport for ReferenceValueImport {
    type Mapping = DepartmentValueMapping;
    type Item = ReferenceValuePreviewItem;
    type Stats = ImportStatistics;

    fn name(&self) -> &str {
        "reference-values"
    }

    fn endpoints(&self) -> ImportEndpoints {
        ImportEndpoints::under("/reference-values/import")
    }

    fn required_fields(&self, strategy: MatchStrategy) -> Vec<&'static str> {
        match strategy {
            MatchStrategy::Code => vec!["department_code", "department_name", "reference_value"],
            MatchStrategy::Name => vec!["department_name", "reference_value"],
        }
    }
}

/// Charge item -> model dimension assignments for one model version
#[derive(Debug, Clone, Copy)]
pub struct DimensionItemImport {
    pub model_version_id: i64,
}

impl SpreadsheetImport for DimensionItemImport {
    type Mapping = DimensionValueMapping;
    type Item = DimensionImportPreviewItem;
    type Stats = DimensionPreviewStatistics;

    fn name(&self) -> &str {
        "dimension-items"
    }

    fn endpoints(&self) -> ImportEndpoints {
        ImportEndpoints::under("/dimension-items/smart-import")
    }

    fn required_fields(&self, _strategy: MatchStrategy) -> Vec<&'static str> {
        vec!["item_code"]
    }

    fn extra_extract_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("model_version_id".to_string(), json!(self.model_version_id));
        params
    }
}
